use super::*;

pub(in crate::tui_shell) fn draw(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let ctx = RenderCtx {
        now: OffsetDateTime::now_utc(),
    };

    draw_header(frame, app, chunks[0], &ctx);
    draw_list(frame, app, chunks[1]);
    draw_footer(frame, app, chunks[2]);

    if let Some(m) = &app.modal {
        modal::draw_modal(frame, m, app);
    }
}

fn draw_header(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect, ctx: &RenderCtx) {
    let summary = pipeline::summarize(&app.repos);
    let mut spans = vec![
        Span::styled(
            "repo-sweep",
            Style::default().fg(Color::Black).bg(Color::White),
        ),
        Span::raw("  "),
        Span::styled(app.owner.as_str(), Style::default().fg(Color::Cyan)),
        Span::raw(format!(
            "  {} repos  {} archived  {} private  {} forks  {} stale  {} marked",
            summary.total,
            summary.archived,
            summary.private,
            summary.forks,
            summary.stale,
            app.marks.len()
        )),
        Span::raw("  "),
    ];
    if app.syncing {
        spans.push(Span::styled("syncing...", Style::default().fg(Color::Yellow)));
    } else {
        let synced = app
            .last_sync
            .map(|t| format!("synced {}", fmt_since(t, ctx.now)))
            .unwrap_or_else(|| "never synced".to_string());
        spans.push(Span::styled(synced, Style::default().fg(Color::Gray)));
    }
    if let Some((done, total)) = app.bulk.progress() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("bulk {}/{}", done, total),
            Style::default().fg(Color::Magenta),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

fn list_title(app: &App) -> String {
    let q = &app.query;
    let mut parts = vec![
        format!("filter={}", q.filter.label()),
        format!(
            "sort={}{}",
            q.sort_field.label(),
            if q.sort_ascending { "" } else { " desc" }
        ),
    ];
    if let Some(lang) = &q.language {
        parts.push(format!("lang={}", lang));
    }
    if !q.search.is_empty() {
        parts.push(format!("search={:?}", q.search));
    }
    if q.show_private {
        parts.push("+private".to_string());
    }
    if q.show_archived {
        parts.push("+archived".to_string());
    }
    format!(
        "Repositories {}/{}  {}",
        app.visible.len(),
        app.repos.len(),
        parts.join(" ")
    )
}

fn draw_list(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let inner = super::super::render_view_chrome(frame, &list_title(app), area);
    let w = pipeline::paginate(app.visible.len(), app.cursor, app.offset, app.height);

    let mut rows = Vec::new();
    for r in &app.visible[w.start..w.end] {
        let marker = if r.marked { "[x]" } else { "[ ]" };
        let mut flags = String::new();
        if r.is_archived {
            flags.push('A');
        }
        if r.is_private {
            flags.push('P');
        }
        if r.is_fork {
            flags.push('F');
        }
        let line = format!(
            "{} {:<36} {:>5}* {:>4}f {:>5}d {:<12} {:<3} {}",
            marker,
            truncate(&r.name, 36),
            r.stars,
            r.forks,
            r.days_since_activity,
            truncate(r.language_label(), 12),
            flags,
            r.reason.as_deref().unwrap_or("")
        );
        let style = if r.is_archived {
            Style::default().fg(Color::DarkGray)
        } else if r.reason.is_some() {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        rows.push(ListItem::new(line).style(style));
    }
    if app.visible.is_empty() {
        rows.push(ListItem::new(if app.repos.is_empty() {
            "(no repositories cached yet; press r to sync)"
        } else {
            "(nothing matches the current filters)"
        }));
    }

    let mut state = ListState::default();
    if !app.visible.is_empty() {
        state.select(Some(w.cursor - w.start));
    }
    let list = List::new(rows).highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_stateful_widget(list, inner, &mut state);
}

fn draw_footer(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let mut lines = Vec::new();
    match &app.status {
        Some(b) => {
            let color = match b.level {
                BannerLevel::Info => Color::White,
                BannerLevel::Success => Color::Green,
                BannerLevel::Error => Color::Red,
            };
            lines.push(Line::from(Span::styled(b.text.as_str(), Style::default().fg(color))));
        }
        None => lines.push(Line::from("")),
    }
    if app.searching {
        lines.push(Line::from(vec![
            Span::styled("/", Style::default().fg(Color::Cyan)),
            Span::raw(app.search.buf.as_str()),
        ]));
        let x = app.search.cursor as u16 + 1;
        frame.set_cursor_position((area.x + x, area.y + 2));
    } else {
        lines.push(Line::from(Span::styled(
            "space mark  x archive/unarchive  f filter  s sort  / search  l lang  r sync  e export  ? help  q quit",
            Style::default().fg(Color::Gray),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::TOP)),
        area,
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('~');
    out
}
