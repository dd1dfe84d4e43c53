use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crossterm::event::{KeyCode, KeyEvent};

use super::app::{Command, confirm_bulk, cancel_bulk, fmt_ts_day};
use super::view::render_view_chrome_with_header;
use super::{App, Modal, ReadmeState};

const HELP: &[&str] = &[
    "j/k, arrows   move",
    "PgUp/PgDn     page",
    "g/G           first/last",
    "space         toggle mark",
    "a / A         mark all visible / clear marks",
    "f             cycle filter (all, stale, zero-engagement, forks)",
    "l             pick language",
    "s / S         cycle sort field / flip direction",
    "/             search by name (Esc clears)",
    "p / h         show private / show archived",
    "Enter         details and README",
    "x             archive or unarchive marked repositories",
    "r             sync now",
    "e             export marked to JSON",
    "q / Esc       quit or close",
];

fn modal_title(modal: &Modal) -> Line<'static> {
    let (label, color) = match modal {
        Modal::Detail { .. } => ("Details", Color::Cyan),
        Modal::Confirm { .. } => ("Confirm", Color::Red),
        Modal::Help => ("Help", Color::Yellow),
        Modal::LanguagePicker { .. } => ("Language", Color::Yellow),
    };
    Line::from(Span::styled(label, Style::default().fg(color)))
}

fn modal_lines(modal: &Modal, app: &App) -> Vec<String> {
    match modal {
        Modal::Detail { repo, readme, .. } => {
            let mut out = vec![
                repo.full_name.clone(),
                if repo.description.is_empty() {
                    "(no description)".to_string()
                } else {
                    repo.description.clone()
                },
                String::new(),
                format!("stars: {}  forks: {}", repo.stars, repo.forks),
                format!("language: {}", repo.language_label()),
                format!(
                    "last push: {} ({} days ago)",
                    fmt_ts_day(&repo.pushed_at),
                    repo.days_since_activity
                ),
                format!("created: {}", fmt_ts_day(&repo.created_at)),
                format!(
                    "archived: {}  fork: {}  private: {}",
                    repo.is_archived, repo.is_fork, repo.is_private
                ),
            ];
            let verdict = app.classifier.classify(repo);
            out.push(format!(
                "candidate: {} ({})",
                if verdict.is_candidate { "yes" } else { "no" },
                verdict.reason
            ));
            out.push(String::new());
            match readme {
                ReadmeState::Loading => out.push("loading README...".to_string()),
                ReadmeState::Missing => out.push("(no README)".to_string()),
                ReadmeState::Failed(err) => out.push(format!("README unavailable: {err}")),
                ReadmeState::Loaded(text) => out.extend(text.lines().map(str::to_string)),
            }
            out
        }
        Modal::Confirm { kind, names, .. } => {
            let mut out = vec![
                format!("{} {} repositories?", kind.verb(), names.len()),
                String::new(),
            ];
            out.extend(names.iter().map(|n| format!("  {n}")));
            out.push(String::new());
            out.push("y/Enter: proceed   n/Esc: cancel".to_string());
            out
        }
        Modal::Help => HELP.iter().map(|s| s.to_string()).collect(),
        Modal::LanguagePicker { options, selected } => options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{} {}", if i == *selected { ">" } else { " " }, o))
            .collect(),
    }
}

pub(super) fn draw_modal(frame: &mut ratatui::Frame, modal: &Modal, app: &App) {
    let area = frame.area();
    let w = area.width.saturating_sub(6).clamp(20, 90);
    let h = area.height.saturating_sub(6).clamp(8, 30);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    let box_area = Rect {
        x,
        y,
        width: w,
        height: h,
    };

    frame.render_widget(ratatui::widgets::Clear, box_area);
    let inner = render_view_chrome_with_header(frame, modal_title(modal), box_area);

    let lines = modal_lines(modal, app);
    let scroll = match modal {
        Modal::Detail { scroll, .. } | Modal::Confirm { scroll, .. } => *scroll,
        Modal::LanguagePicker { selected, .. } => {
            selected.saturating_sub(usize::from(inner.height.saturating_sub(1)))
        }
        Modal::Help => 0,
    };
    let scroll = scroll.min(lines.len().saturating_sub(1)) as u16;

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0)])
        .split(inner);
    let lines: Vec<Line> = lines.into_iter().map(Line::from).collect();
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        parts[0],
    );
}

pub(super) fn handle_modal_key(app: &mut App, key: KeyEvent) -> Vec<Command> {
    let Some(modal) = app.modal.as_mut() else {
        return Vec::new();
    };

    match modal {
        Modal::Help => {
            app.modal = None;
            Vec::new()
        }

        Modal::Detail { scroll, .. } => {
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => *scroll = scroll.saturating_add(1),
                KeyCode::Char('k') | KeyCode::Up => *scroll = scroll.saturating_sub(1),
                KeyCode::PageDown => *scroll = scroll.saturating_add(10),
                KeyCode::PageUp => *scroll = scroll.saturating_sub(10),
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => app.modal = None,
                _ => {}
            }
            Vec::new()
        }

        Modal::Confirm { scroll, .. } => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => confirm_bulk(app),
            KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
                cancel_bulk(app);
                Vec::new()
            }
            KeyCode::Char('j') | KeyCode::Down => {
                *scroll = scroll.saturating_add(1);
                Vec::new()
            }
            KeyCode::Char('k') | KeyCode::Up => {
                *scroll = scroll.saturating_sub(1);
                Vec::new()
            }
            _ => Vec::new(),
        },

        Modal::LanguagePicker { options, selected } => {
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    *selected = (*selected + 1).min(options.len().saturating_sub(1));
                }
                KeyCode::Char('k') | KeyCode::Up => *selected = selected.saturating_sub(1),
                KeyCode::Enter => {
                    let choice = if *selected == 0 {
                        None
                    } else {
                        options.get(*selected).cloned()
                    };
                    app.modal = None;
                    app.query.language = choice;
                    let keep = app.selected_full_name();
                    app.recompute_keeping(keep.as_deref());
                }
                KeyCode::Esc | KeyCode::Char('q') => app.modal = None,
                _ => {}
            }
            Vec::new()
        }
    }
}
