use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders};

use time::OffsetDateTime;

#[derive(Clone, Copy, Debug)]
pub(super) struct RenderCtx {
    pub(super) now: OffsetDateTime,
}

pub(super) fn render_view_chrome(frame: &mut ratatui::Frame, title: &str, area: Rect) -> Rect {
    let header = Line::from(vec![Span::styled(
        title.to_string(),
        Style::default().fg(Color::Yellow),
    )]);
    render_view_chrome_with_header(frame, header, area)
}

pub(super) fn render_view_chrome_with_header<'a>(
    frame: &mut ratatui::Frame,
    header: Line<'a>,
    area: Rect,
) -> Rect {
    let outer = Block::default().borders(Borders::ALL).title(header);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);
    inner
}
