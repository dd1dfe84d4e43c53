    use std::collections::BTreeSet;

    use rusqlite::params;
    use time::Duration;

    use super::*;
    use crate::model::{
        Actor, ChangeAction, ChangeRecord, RepositorySnapshot, SyncOutcome, SyncStatus,
        from_unix_millis, to_unix_millis,
    };

    fn repo(owner: &str, name: &str, stars: u32) -> RepositorySnapshot {
        let mut r = RepositorySnapshot::new(owner, name);
        r.stars = stars;
        r.pushed_at = "2024-01-01T00:00:00Z".to_string();
        r.created_at = "2020-01-01T00:00:00Z".to_string();
        r
    }

    fn at(ms: i64) -> time::OffsetDateTime {
        from_unix_millis(ms).expect("valid millis")
    }

    #[test]
    fn bootstrap_is_idempotent() -> Result<(), StoreError> {
        let tmp = tempfile::tempdir().map_err(|e| StoreError::Io(e.to_string()))?;
        let path = tmp.path().join("cache.db");
        {
            let cache = SqliteCache::open(&path)?;
            assert_eq!(cache.schema_version()?, 1);
        }
        let cache = SqliteCache::open(&path)?;
        assert_eq!(cache.schema_version()?, 1);
        Ok(())
    }

    #[test]
    fn last_sync_time_is_absent_until_first_upsert() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        assert_eq!(cache.get_last_sync_time("octo")?, None);

        let batch = vec![repo("octo", "a", 1), repo("octo", "b", 2), repo("octo", "c", 3)];
        let report = cache.upsert_all("octo", &batch)?;
        assert_eq!(report.inserted, 3);
        assert_eq!(report.updated, 0);
        assert_eq!(cache.get_last_sync_time("octo")?, Some(report.synced_at));

        // Another owner is unaffected.
        assert_eq!(cache.get_last_sync_time("someone-else")?, None);
        Ok(())
    }

    fn distinct_sync_stamps(cache: &SqliteCache, owner: &str) -> Result<Vec<i64>, StoreError> {
        let mut stmt = cache
            .conn
            .prepare("SELECT DISTINCT synced_at FROM repositories WHERE owner = ?1")?;
        let rows = stmt.query_map(params![owner], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<i64>, _>>()?)
    }

    #[test]
    fn every_row_in_a_batch_shares_the_batch_timestamp() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        let batch: Vec<_> = (0..12).map(|i| repo("octo", &format!("r{i:02}"), i)).collect();
        let report = cache.upsert_all("octo", &batch)?;

        assert_eq!(cache.count("octo")?, 12);
        assert_eq!(
            distinct_sync_stamps(&cache, "octo")?,
            vec![to_unix_millis(report.synced_at)]
        );
        assert_eq!(cache.get_last_sync_time("octo")?, Some(report.synced_at));
        Ok(())
    }

    #[test]
    fn upsert_replaces_rows_wholesale_and_counts_updates() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        cache.upsert_all_at("octo", &[repo("octo", "a", 1), repo("octo", "b", 2)], at(1_000))?;

        let mut changed = repo("octo", "a", 50);
        changed.description = "fresh".to_string();
        changed.is_archived = true;
        let report = cache.upsert_all_at("octo", &[changed.clone(), repo("octo", "c", 0)], at(2_000))?;
        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 1);

        let a = cache.get_repo("octo", "a")?;
        assert_eq!(a, changed);
        assert_eq!(cache.get_last_sync_time("octo")?, Some(at(2_000)));
        Ok(())
    }

    #[test]
    fn failed_batch_leaves_cache_untouched() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        cache.upsert_all_at("octo", &[repo("octo", "a", 1), repo("octo", "b", 2)], at(1_000))?;
        let before = cache.get_all("octo")?;

        // Third item belongs to another owner; the first two would otherwise land.
        let batch = vec![repo("octo", "a", 99), repo("octo", "new", 5), repo("intruder", "x", 0)];
        assert!(cache.upsert_all_at("octo", &batch, at(2_000)).is_err());

        assert_eq!(cache.get_all("octo")?, before);
        assert_eq!(cache.get_last_sync_time("octo")?, Some(at(1_000)));
        Ok(())
    }

    #[test]
    fn duplicate_full_name_in_batch_rolls_back() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        cache.upsert_all_at("octo", &[repo("octo", "a", 1)], at(1_000))?;

        let mut clash = repo("octo", "b", 0);
        clash.full_name = "octo/a".to_string();
        let res = cache.upsert_all_at("octo", &[repo("octo", "c", 3), clash], at(2_000));
        assert!(matches!(res, Err(StoreError::Io(_))));

        let names: Vec<String> = cache.get_all("octo")?.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a".to_string()]);
        Ok(())
    }

    #[test]
    fn get_all_is_name_ordered() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        cache.upsert_all("octo", &[repo("octo", "zeta", 0), repo("octo", "alpha", 0), repo("octo", "mid", 0)])?;
        let names: Vec<String> = cache.get_all("octo")?.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        Ok(())
    }

    #[test]
    fn delete_older_than_evicts_vanished_repos() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        cache.upsert_all_at("octo", &[repo("octo", "a", 0), repo("octo", "gone", 0)], at(1_000))?;
        let report = cache.upsert_all_at("octo", &[repo("octo", "a", 0)], at(5_000))?;

        let removed = cache.delete_older_than("octo", report.synced_at)?;
        assert_eq!(removed, 1);
        assert!(matches!(cache.get_repo("octo", "gone"), Err(StoreError::NotFound(_))));
        assert_eq!(cache.count("octo")?, 1);

        // Nothing older remains.
        assert_eq!(cache.delete_older_than("octo", report.synced_at)?, 0);
        Ok(())
    }

    #[test]
    fn point_lookup_of_missing_repo_is_not_found() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        assert!(matches!(cache.get_repo("octo", "nope"), Err(StoreError::NotFound(_))));
        assert!(matches!(
            cache.set_archived("octo", "nope", true),
            Err(StoreError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn set_archived_flips_only_that_flag() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        let report = cache.upsert_all("octo", &[repo("octo", "a", 7)])?;
        cache.set_archived("octo", "a", true)?;
        let a = cache.get_repo("octo", "a")?;
        assert!(a.is_archived);
        assert_eq!(a.stars, 7);
        assert_eq!(cache.get_last_sync_time("octo")?, Some(report.synced_at));
        Ok(())
    }

    #[test]
    fn marks_are_idempotent() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        cache.add_mark("octo", "octo/a")?;
        cache.add_mark("octo", "octo/a")?;
        cache.remove_mark("octo", "octo/missing")?;
        assert_eq!(cache.get_marks("octo")?, BTreeSet::from(["octo/a".to_string()]));

        cache.remove_mark("octo", "octo/a")?;
        cache.remove_mark("octo", "octo/a")?;
        assert!(cache.get_marks("octo")?.is_empty());
        Ok(())
    }

    #[test]
    fn replace_marks_swaps_the_set_per_owner() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        cache.add_mark("octo", "octo/a")?;
        cache.add_mark("octo", "octo/b")?;
        cache.add_mark("other", "other/z")?;

        let wanted = BTreeSet::from(["octo/b".to_string(), "octo/c".to_string()]);
        cache.replace_marks("octo", &wanted)?;
        assert_eq!(cache.get_marks("octo")?, wanted);
        assert_eq!(cache.get_marks("other")?.len(), 1);

        cache.clear_marks("octo")?;
        assert!(cache.get_marks("octo")?.is_empty());
        assert_eq!(cache.get_marks("other")?.len(), 1);
        Ok(())
    }

    #[test]
    fn marks_survive_reopen() -> Result<(), StoreError> {
        let tmp = tempfile::tempdir().map_err(|e| StoreError::Io(e.to_string()))?;
        let path = tmp.path().join("cache.db");
        {
            let mut cache = SqliteCache::open(&path)?;
            cache.add_mark("octo", "octo/keep")?;
        }
        let cache = SqliteCache::open(&path)?;
        assert!(cache.get_marks("octo")?.contains("octo/keep"));
        Ok(())
    }

    #[test]
    fn sync_history_tracks_running_then_final_state() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        let first = cache.start_sync("octo", at(1_000))?;
        cache.finish_sync(
            first,
            &SyncOutcome {
                status: SyncStatus::Success,
                completed_at: at(1_250),
                repos_fetched: 3,
                repos_inserted: 2,
                repos_updated: 1,
                error_message: None,
            },
        )?;
        let second = cache.start_sync("octo", at(2_000))?;

        let history = cache.list_sync_history("octo", 10)?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second);
        assert_eq!(history[0].status, SyncStatus::Running);
        assert_eq!(history[0].completed_at, None);
        assert_eq!(history[1].duration_ms, Some(250));
        assert_eq!(history[1].repos_inserted, 2);

        cache.finish_sync(
            second,
            &SyncOutcome {
                status: SyncStatus::Error,
                completed_at: at(2_100),
                repos_fetched: 0,
                repos_inserted: 0,
                repos_updated: 0,
                error_message: Some("rate limited".to_string()),
            },
        )?;
        let last_ok = cache.last_successful_sync("octo")?.expect("one success");
        assert_eq!(last_ok.id, first);
        Ok(())
    }

    #[test]
    fn finishing_unknown_sync_is_not_found() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        let res = cache.finish_sync(
            42,
            &SyncOutcome {
                status: SyncStatus::Success,
                completed_at: at(0) + Duration::seconds(1),
                repos_fetched: 0,
                repos_inserted: 0,
                repos_updated: 0,
                error_message: None,
            },
        );
        assert!(matches!(res, Err(StoreError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn change_log_is_append_only() -> Result<(), StoreError> {
        let mut cache = SqliteCache::in_memory()?;
        let before = repo("octo", "a", 0);
        let mut after = before.clone();
        after.is_archived = true;

        let change = ChangeRecord::new("octo", "a", ChangeAction::Archived, Actor::User)
            .with_states(Some(&before), Some(&after))
            .with_note("bulk archive");
        let id1 = cache.record_change(&change)?;
        let id2 = cache.record_change(&change)?;
        assert!(id2 > id1);
        assert_eq!(cache.count_changes("octo", "archived")?, 2);
        Ok(())
    }
