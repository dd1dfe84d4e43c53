    use super::*;
    use crate::classify::HeuristicClassifier;
    use crate::test_support::repo;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn code(c: KeyCode) -> KeyEvent {
        KeyEvent::new(c, KeyModifiers::NONE)
    }

    fn app_with(repos: Vec<RepositorySnapshot>) -> App {
        let mut app = App::new("octo", Arc::new(HeuristicClassifier::default()))
            .with_cached(repos, BTreeSet::new(), None);
        app.height = 3;
        app.clamp();
        app
    }

    fn numbered(n: usize) -> Vec<RepositorySnapshot> {
        (0..n).map(|i| repo("octo", &format!("r{i:02}"), 10, 1)).collect()
    }

    fn press(app: &mut App, keys: &str) -> Vec<Command> {
        keys.chars().flat_map(|c| handle_key(app, key(c))).collect()
    }

    #[test]
    fn cursor_scrolls_and_clamps() {
        let mut app = app_with(numbered(10));
        press(&mut app, "jjjjj");
        assert_eq!(app.cursor, 5);
        assert_eq!(app.offset, 3);

        press(&mut app, "G");
        assert_eq!(app.cursor, 9);
        assert_eq!(app.offset, 7);
        press(&mut app, "j");
        assert_eq!(app.cursor, 9);

        press(&mut app, "g");
        assert_eq!((app.cursor, app.offset), (0, 0));
        press(&mut app, "k");
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn narrowing_the_view_clamps_the_cursor() {
        let mut repos = numbered(10);
        repos[1].stars = 0;
        repos[1].days_since_activity = 500;
        let mut app = app_with(repos);
        press(&mut app, "G");
        assert_eq!(app.cursor, 9);

        // all -> stale
        press(&mut app, "f");
        assert_eq!(app.visible.len(), 1);
        assert_eq!(app.cursor, 0);
        assert_eq!(app.offset, 0);
    }

    #[test]
    fn resize_keeps_cursor_visible() {
        let mut app = app_with(numbered(30));
        app.resize(40);
        press(&mut app, "G");
        app.resize(10);
        assert_eq!(app.height, 3);
        assert!(app.cursor < app.offset + app.height);
        assert!(app.offset <= app.cursor);
    }

    #[test]
    fn refresh_relocates_the_selection() {
        let mut app = app_with(numbered(5));
        press(&mut app, "jjj");
        assert_eq!(app.selected_full_name().as_deref(), Some("octo/r03"));

        let mut fresh = numbered(5);
        fresh.insert(0, repo("octo", "b-new", 1, 1));
        fresh.insert(0, repo("octo", "a-new", 1, 1));
        let synced_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let cmds = handle_msg(
            &mut app,
            AppMsg::Refresh(RefreshMsg::Completed {
                repos: fresh,
                synced_at,
            }),
        );
        assert!(cmds.is_empty());
        assert_eq!(app.selected_full_name().as_deref(), Some("octo/r03"));
        assert_eq!(app.cursor, 5);
        assert!(app.offset <= 5 && 5 < app.offset + app.height);
        assert_eq!(app.last_sync, Some(synced_at));
        assert!(!app.syncing);
    }

    #[test]
    fn refresh_that_drops_the_selection_falls_back_to_clamping() {
        let mut app = app_with(numbered(5));
        press(&mut app, "G");
        handle_msg(
            &mut app,
            AppMsg::Refresh(RefreshMsg::Completed {
                repos: numbered(2),
                synced_at: OffsetDateTime::now_utc(),
            }),
        );
        assert_eq!(app.cursor, 1);
    }

    #[test]
    fn refresh_lifecycle_updates_banner() {
        let mut app = app_with(numbered(1));
        handle_msg(&mut app, AppMsg::Refresh(RefreshMsg::Started));
        assert!(app.syncing);
        assert!(press(&mut app, "r").is_empty());

        handle_msg(&mut app, AppMsg::Refresh(RefreshMsg::Failed("boom".to_string())));
        assert!(!app.syncing);
        let banner = app.status.clone().unwrap();
        assert_eq!(banner.level, BannerLevel::Error);
        assert!(banner.text.contains("boom"));
        assert_eq!(app.repos.len(), 1);

        assert_eq!(press(&mut app, "r"), vec![Command::SyncNow]);
    }

    #[test]
    fn toggling_a_mark_persists_and_audits() {
        let mut app = app_with(numbered(3));
        let cmds = press(&mut app, " ");
        assert!(app.marks.contains("octo/r00"));
        assert!(app.visible[0].marked);
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], Command::PersistMarks(app.marks.clone()));
        match &cmds[1] {
            Command::RecordChange(c) => {
                assert_eq!(c.action, ChangeAction::Marked);
                assert_eq!(c.repo_name, "r00");
            }
            other => panic!("unexpected {other:?}"),
        }

        press(&mut app, " ");
        assert!(app.marks.is_empty());
    }

    #[test]
    fn mark_all_is_idempotent_and_clear_resets() {
        let mut app = app_with(numbered(3));
        press(&mut app, " ");
        let cmds = press(&mut app, "a");
        assert_eq!(app.marks.len(), 3);
        // one persist plus two newly marked
        assert_eq!(cmds.len(), 3);
        assert!(press(&mut app, "a").is_empty());
        assert_eq!(app.marks.len(), 3);

        let cmds = press(&mut app, "A");
        assert!(app.marks.is_empty());
        assert_eq!(cmds[0], Command::PersistMarks(BTreeSet::new()));
        assert!(press(&mut app, "A").is_empty());
    }

    #[test]
    fn bulk_archive_flow_keeps_failed_marks() {
        let mut app = app_with(numbered(3));
        press(&mut app, "a");

        assert!(press(&mut app, "x").is_empty());
        assert!(matches!(app.modal, Some(Modal::Confirm { kind: BulkKind::Archive, .. })));

        let cmds = press(&mut app, "y");
        let Some(Command::BulkStep(step)) = cmds.into_iter().next() else {
            panic!("expected first step");
        };
        assert_eq!(step.index, 0);
        assert!(app.modal.is_none());

        let cmds = handle_msg(&mut app, AppMsg::BulkStepDone { step, result: Ok(()) });
        let Some(Command::BulkStep(step)) = cmds.into_iter().next() else {
            panic!("expected second step");
        };
        assert!(press(&mut app, "q").is_empty());
        assert!(!app.quit);

        let cmds = handle_msg(
            &mut app,
            AppMsg::BulkStepDone {
                step,
                result: Err("forbidden".to_string()),
            },
        );
        let Some(Command::BulkStep(step)) = cmds.into_iter().next() else {
            panic!("expected third step");
        };
        let cmds = handle_msg(&mut app, AppMsg::BulkStepDone { step, result: Ok(()) });

        let expected: BTreeSet<String> = ["octo/r01".to_string()].into_iter().collect();
        assert_eq!(app.marks, expected);
        assert_eq!(cmds, vec![Command::PersistMarks(expected)]);
        let banner = app.status.clone().unwrap();
        assert!(banner.text.contains("2 succeeded, 1 failed"));
        assert!(!app.bulk.is_processing());

        // archived repos drop out of the default view
        let names: Vec<_> = app.visible.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["r01"]);
        assert!(app.repos.iter().filter(|r| r.is_archived).count() == 2);
    }

    #[test]
    fn mixed_batch_is_rejected() {
        let mut repos = numbered(2);
        repos[1].is_archived = true;
        let mut app = app_with(repos);
        press(&mut app, "h");
        press(&mut app, "a");
        press(&mut app, "x");
        assert!(app.modal.is_none());
        assert_eq!(app.status.clone().unwrap().level, BannerLevel::Error);
        assert!(!app.bulk.is_processing());
    }

    #[test]
    fn cancelling_the_confirmation_returns_to_idle() {
        let mut app = app_with(numbered(1));
        press(&mut app, " x");
        assert!(app.modal.is_some());
        handle_key(&mut app, code(KeyCode::Esc));
        assert!(app.modal.is_none());
        assert!(!app.quit);
        assert!(press(&mut app, "x").is_empty());
        assert!(app.modal.is_some());
    }

    #[test]
    fn search_filters_live_and_escape_clears() {
        let mut app = app_with(numbered(12));
        press(&mut app, "/r1");
        assert!(app.searching);
        let names: Vec<_> = app.visible.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["r10", "r11"]);

        handle_key(&mut app, code(KeyCode::Enter));
        assert!(!app.searching);
        assert_eq!(app.query.search, "r1");

        press(&mut app, "/");
        handle_key(&mut app, code(KeyCode::Esc));
        assert!(app.query.search.is_empty());
        assert_eq!(app.visible.len(), 12);
    }

    #[test]
    fn language_picker_sets_the_filter() {
        let mut repos = numbered(3);
        repos[2].language = "Rust".to_string();
        let mut app = app_with(repos);
        press(&mut app, "l");
        handle_key(&mut app, code(KeyCode::Down));
        handle_key(&mut app, code(KeyCode::Enter));
        assert_eq!(app.query.language.as_deref(), Some("Rust"));
        assert_eq!(app.visible.len(), 1);

        press(&mut app, "l");
        handle_key(&mut app, code(KeyCode::Up));
        handle_key(&mut app, code(KeyCode::Enter));
        assert_eq!(app.query.language, None);
    }

    #[test]
    fn detail_loads_readme_for_the_open_repo() {
        let mut app = app_with(numbered(2));
        let cmds = handle_key(&mut app, code(KeyCode::Enter));
        assert_eq!(
            cmds,
            vec![Command::LoadReadme {
                owner: "octo".to_string(),
                name: "r00".to_string()
            }]
        );

        handle_msg(
            &mut app,
            AppMsg::Readme {
                full_name: "octo/r01".to_string(),
                result: Ok(Some("other".to_string())),
            },
        );
        assert!(matches!(
            &app.modal,
            Some(Modal::Detail { readme: ReadmeState::Loading, .. })
        ));

        handle_msg(
            &mut app,
            AppMsg::Readme {
                full_name: "octo/r00".to_string(),
                result: Ok(None),
            },
        );
        assert!(matches!(
            &app.modal,
            Some(Modal::Detail { readme: ReadmeState::Missing, .. })
        ));
        handle_key(&mut app, code(KeyCode::Esc));
        assert!(app.modal.is_none());
    }

    #[test]
    fn export_requires_marks() {
        let mut app = app_with(numbered(2));
        assert!(press(&mut app, "e").is_empty());
        press(&mut app, " ");
        let cmds = press(&mut app, "e");
        match cmds.as_slice() {
            [Command::Export(list)] => assert_eq!(list.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stale_marks_stay_invisible() {
        let marks: BTreeSet<String> = ["octo/ghost".to_string()].into_iter().collect();
        let app = App::new("octo", Arc::new(HeuristicClassifier::default()))
            .with_cached(numbered(2), marks, None);
        assert!(app.marked_repos().is_empty());
        assert!(app.marks.contains("octo/ghost"));
    }

    #[test]
    fn quit_and_help() {
        let mut app = app_with(numbered(1));
        press(&mut app, "?");
        assert_eq!(app.modal, Some(Modal::Help));
        press(&mut app, "z");
        assert!(app.modal.is_none());
        assert_eq!(press(&mut app, "q"), vec![Command::Quit]);
        assert!(app.quit);
    }

    #[test]
    fn since_formatting() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(fmt_since(now, now), "just now");
        assert_eq!(fmt_since(now - time::Duration::minutes(5), now), "5m ago");
        assert_eq!(fmt_since(now - time::Duration::hours(3), now), "3h ago");
        assert_eq!(fmt_ts_day("2024-02-03T04:05:06Z"), "2024-02-03");
        assert_eq!(fmt_ts_day(""), "-");
    }

    #[test]
    fn rapid_mark_writes_persist_the_newest_set() -> Result<()> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let cache = crate::store::SqliteCache::in_memory()?.into_shared();
        let (msg_tx, mut msg_rx) = tokio::sync::mpsc::unbounded_channel();
        let (marks_tx, writer) = super::runtime::spawn_marks_writer(
            rt.handle(),
            cache.clone(),
            "octo".to_string(),
            msg_tx,
        );

        for i in 0..50 {
            let set: BTreeSet<String> = if i % 2 == 0 {
                ["octo/x".to_string()].into()
            } else {
                BTreeSet::new()
            };
            marks_tx.send(set)?;
        }
        marks_tx.send(["octo/final".to_string()].into())?;
        drop(marks_tx);
        rt.block_on(writer)?;

        let stored = crate::store::lock(&cache)?.get_marks("octo")?;
        assert_eq!(stored, BTreeSet::from(["octo/final".to_string()]));

        let mut last = None;
        while let Ok(msg) = msg_rx.try_recv() {
            last = Some(msg);
        }
        assert!(matches!(last, Some(AppMsg::Persisted(Ok(())))));
        Ok(())
    }
