use super::*;

pub(in crate::tui_shell) fn handle_key(app: &mut App, key: KeyEvent) -> Vec<Command> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit = true;
        return vec![Command::Quit];
    }
    if app.modal.is_some() {
        return modal::handle_modal_key(app, key);
    }
    if app.searching {
        handle_search_key(app, key);
        return Vec::new();
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            if app.bulk.is_processing() {
                app.status = Some(Banner::error(
                    "bulk action in progress; wait for it to finish (ctrl-c forces quit)",
                ));
                return Vec::new();
            }
            app.quit = true;
            vec![Command::Quit]
        }

        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down();
            Vec::new()
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
            Vec::new()
        }
        KeyCode::PageDown => {
            app.page_down();
            Vec::new()
        }
        KeyCode::PageUp => {
            app.page_up();
            Vec::new()
        }
        KeyCode::Char('g') | KeyCode::Home => {
            app.home();
            Vec::new()
        }
        KeyCode::Char('G') | KeyCode::End => {
            app.end();
            Vec::new()
        }

        KeyCode::Char(' ') => toggle_mark(app),
        KeyCode::Char('a') => mark_all_visible(app),
        KeyCode::Char('A') => clear_marks(app),

        KeyCode::Char('f') => {
            app.query.filter = app.query.filter.next();
            requery(app);
            Vec::new()
        }
        KeyCode::Char('s') => {
            app.query.sort_field = app.query.sort_field.next();
            requery(app);
            Vec::new()
        }
        KeyCode::Char('S') => {
            app.query.sort_ascending = !app.query.sort_ascending;
            requery(app);
            Vec::new()
        }
        KeyCode::Char('p') => {
            app.query.show_private = !app.query.show_private;
            requery(app);
            Vec::new()
        }
        KeyCode::Char('h') => {
            app.query.show_archived = !app.query.show_archived;
            requery(app);
            Vec::new()
        }
        KeyCode::Char('l') => {
            open_language_picker(app);
            Vec::new()
        }
        KeyCode::Char('/') => {
            app.searching = true;
            app.search.set(app.query.search.clone());
            Vec::new()
        }

        KeyCode::Enter => open_detail(app),
        KeyCode::Char('x') => {
            begin_bulk(app);
            Vec::new()
        }
        KeyCode::Char('r') => sync_now(app),
        KeyCode::Char('e') => export_marked(app),
        KeyCode::Char('?') => {
            app.modal = Some(Modal::Help);
            Vec::new()
        }

        _ => Vec::new(),
    }
}

fn requery(app: &mut App) {
    let keep = app.selected_full_name();
    app.recompute_keeping(keep.as_deref());
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.searching = false;
            app.search.clear();
            app.query.search.clear();
        }
        KeyCode::Enter => {
            app.searching = false;
            app.search.push_history(&app.query.search);
            return;
        }
        KeyCode::Backspace => app.search.backspace(),
        KeyCode::Delete => app.search.delete(),
        KeyCode::Left => app.search.move_left(),
        KeyCode::Right => app.search.move_right(),
        KeyCode::Up => app.search.history_up(),
        KeyCode::Down => app.search.history_down(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.search.clear(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.search.insert_char(c)
        }
        _ => return,
    }
    app.query.search = app.search.buf.clone();
    requery(app);
}

fn toggle_mark(app: &mut App) -> Vec<Command> {
    let Some(repo) = app.selected().cloned() else {
        return Vec::new();
    };
    let marked = if app.marks.contains(&repo.full_name) {
        app.marks.remove(&repo.full_name);
        false
    } else {
        app.marks.insert(repo.full_name.clone());
        true
    };
    let change = app.mark_change(&repo, marked);
    requery(app);
    vec![
        Command::PersistMarks(app.marks.clone()),
        Command::RecordChange(change),
    ]
}

fn mark_all_visible(app: &mut App) -> Vec<Command> {
    let fresh: Vec<RepositorySnapshot> = app
        .visible
        .iter()
        .filter(|r| !app.marks.contains(&r.full_name))
        .cloned()
        .collect();
    if fresh.is_empty() {
        return Vec::new();
    }
    let mut cmds = Vec::with_capacity(fresh.len() + 1);
    for repo in &fresh {
        app.marks.insert(repo.full_name.clone());
        cmds.push(Command::RecordChange(app.mark_change(repo, true)));
    }
    app.status = Some(Banner::info(format!("marked {} repositories", fresh.len())));
    requery(app);
    cmds.insert(0, Command::PersistMarks(app.marks.clone()));
    cmds
}

fn clear_marks(app: &mut App) -> Vec<Command> {
    if app.marks.is_empty() {
        return Vec::new();
    }
    let cleared: Vec<RepositorySnapshot> = app
        .repos
        .iter()
        .filter(|r| app.marks.contains(&r.full_name))
        .cloned()
        .collect();
    let mut cmds = vec![Command::PersistMarks(BTreeSet::new())];
    cmds.extend(
        cleared
            .iter()
            .map(|r| Command::RecordChange(app.mark_change(r, false))),
    );
    app.marks.clear();
    app.status = Some(Banner::info("cleared all marks"));
    requery(app);
    cmds
}

fn open_language_picker(app: &mut App) {
    let mut options = vec!["(all languages)".to_string()];
    options.extend(app.languages.iter().cloned());
    let selected = app
        .query
        .language
        .as_ref()
        .and_then(|l| options.iter().position(|o| o == l))
        .unwrap_or(0);
    app.modal = Some(Modal::LanguagePicker { options, selected });
}

fn open_detail(app: &mut App) -> Vec<Command> {
    let Some(repo) = app.selected().cloned() else {
        return Vec::new();
    };
    let cmd = Command::LoadReadme {
        owner: repo.owner.clone(),
        name: repo.name.clone(),
    };
    app.modal = Some(Modal::Detail {
        repo: Box::new(repo),
        readme: ReadmeState::Loading,
        scroll: 0,
    });
    vec![cmd]
}

fn begin_bulk(app: &mut App) {
    let marked = app.marked_repos();
    match app.bulk.begin(marked) {
        Ok(plan) => {
            let kind = plan.kind;
            let names = plan.items.iter().map(|r| r.full_name.clone()).collect();
            app.modal = Some(Modal::Confirm {
                kind,
                names,
                scroll: 0,
            });
        }
        Err(err) => app.status = Some(Banner::error(err.to_string())),
    }
}

fn sync_now(app: &mut App) -> Vec<Command> {
    if app.syncing {
        app.status = Some(Banner::info("sync already in progress"));
        return Vec::new();
    }
    app.status = Some(Banner::info("sync requested"));
    vec![Command::SyncNow]
}

fn export_marked(app: &mut App) -> Vec<Command> {
    let marked = app.marked_repos();
    if marked.is_empty() {
        app.status = Some(Banner::error("nothing marked to export"));
        return Vec::new();
    }
    app.status = Some(Banner::info(format!("exporting {} repositories", marked.len())));
    vec![Command::Export(marked)]
}

/// Confirm modal accepted: start the first step.
pub(in crate::tui_shell) fn confirm_bulk(app: &mut App) -> Vec<Command> {
    app.modal = None;
    match app.bulk.confirm() {
        Some(step) => {
            let (_, total) = app.bulk.progress().unwrap_or((0, 0));
            app.status = Some(Banner::info(format!(
                "{} 1/{}: {}",
                step.kind.verb(),
                total,
                step.repo.full_name
            )));
            vec![Command::BulkStep(step)]
        }
        None => Vec::new(),
    }
}

pub(in crate::tui_shell) fn cancel_bulk(app: &mut App) {
    app.modal = None;
    app.bulk.cancel();
    app.status = Some(Banner::info("bulk action cancelled"));
}
