use super::*;

/// Folds one asynchronous completion into the state.
pub(in crate::tui_shell) fn handle_msg(app: &mut App, msg: AppMsg) -> Vec<Command> {
    match msg {
        AppMsg::Refresh(RefreshMsg::Started) => {
            app.syncing = true;
            Vec::new()
        }
        AppMsg::Refresh(RefreshMsg::Completed { repos, synced_at }) => {
            app.syncing = false;
            app.last_sync = Some(synced_at);
            let n = repos.len();
            app.replace_repos(repos);
            if !app.bulk.is_processing() {
                app.status = Some(Banner::success(format!("synced {n} repositories")));
            }
            Vec::new()
        }
        AppMsg::Refresh(RefreshMsg::Failed(err)) => {
            app.syncing = false;
            app.status = Some(Banner::error(format!("sync failed: {err}")));
            Vec::new()
        }

        AppMsg::BulkStepDone { step, result } => bulk_step_done(app, step, result),

        AppMsg::Readme { full_name, result } => {
            if let Some(Modal::Detail { repo, readme, .. }) = app.modal.as_mut()
                && repo.full_name == full_name
            {
                *readme = match result {
                    Ok(Some(text)) => ReadmeState::Loaded(text),
                    Ok(None) => ReadmeState::Missing,
                    Err(err) => ReadmeState::Failed(err),
                };
            }
            Vec::new()
        }

        AppMsg::Exported(Ok(path)) => {
            app.status = Some(Banner::success(format!("exported to {}", path.display())));
            Vec::new()
        }
        AppMsg::Exported(Err(err)) => {
            app.status = Some(Banner::error(format!("export failed: {err}")));
            Vec::new()
        }

        AppMsg::Persisted(Ok(())) => Vec::new(),
        AppMsg::Persisted(Err(err)) => {
            app.status = Some(Banner::error(format!("could not save: {err}")));
            Vec::new()
        }
    }
}

fn bulk_step_done(app: &mut App, step: StepRequest, result: Result<(), String>) -> Vec<Command> {
    if result.is_ok() {
        app.set_archived_local(&step.repo.full_name, step.kind == BulkKind::Archive);
    }
    match app.bulk.record(step.index, result) {
        None => Vec::new(),
        Some(Advance::Step(next)) => {
            let (done, total) = app.bulk.progress().unwrap_or((next.index, next.index + 1));
            app.status = Some(Banner::info(format!(
                "{} {}/{}: {}",
                next.kind.verb(),
                done + 1,
                total,
                next.repo.full_name
            )));
            let keep = app.selected_full_name();
            app.recompute_keeping(keep.as_deref());
            vec![Command::BulkStep(next)]
        }
        Some(Advance::Done(summary)) => {
            summary.prune_marks(&mut app.marks);
            app.status = Some(if summary.tally.failed == 0 {
                Banner::success(summary.banner())
            } else {
                Banner::error(summary.banner())
            });
            app.bulk.reset();
            let keep = app.selected_full_name();
            app.recompute_keeping(keep.as_deref());
            vec![Command::PersistMarks(app.marks.clone())]
        }
    }
}
