use super::*;

impl App {
    pub(in crate::tui_shell) fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
        self.clamp();
    }

    pub(in crate::tui_shell) fn move_down(&mut self) {
        self.cursor = self.cursor.saturating_add(1);
        self.clamp();
    }

    pub(in crate::tui_shell) fn page_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(self.height.max(1));
        self.clamp();
    }

    pub(in crate::tui_shell) fn page_down(&mut self) {
        self.cursor = self.cursor.saturating_add(self.height.max(1));
        self.clamp();
    }

    pub(in crate::tui_shell) fn home(&mut self) {
        self.cursor = 0;
        self.offset = 0;
        self.clamp();
    }

    pub(in crate::tui_shell) fn end(&mut self) {
        self.cursor = self.visible.len().saturating_sub(1);
        self.clamp();
    }
}
