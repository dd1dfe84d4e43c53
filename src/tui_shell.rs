use anyhow::Result;

mod app;

mod input;
mod modal;
mod view;

// Make core TUI types/helpers available to submodules via `super::...`.
use app::{App, Modal, ReadmeState};
use view::render_view_chrome;

pub fn run_with_options(opts: crate::tui::TuiRunOptions) -> Result<()> {
    app::run(opts)
}
