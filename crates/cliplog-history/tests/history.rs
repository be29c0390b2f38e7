//! Integration tests for cliplog-history
//!
//! Every test opens a history in its own temporary directory, drives it the
//! way a clipboard watcher would, and checks both the live state and what a
//! reopened history sees.

use cliplog_history::{ClipboardHistory, EntryId, HistoryConfig, HistoryError, StorageConfig};
use tempfile::TempDir;

fn config(temp: &TempDir) -> HistoryConfig {
    cliplog_logging::init_testing();
    HistoryConfig::default()
        .with_storage(StorageConfig::with_data_dir(temp.path()).with_sync_on_write(false))
}

fn texts<'a>(entries: impl Iterator<Item = &'a cliplog_history::Entry>) -> Vec<String> {
    entries.map(|entry| entry.text.clone()).collect()
}

// ============================================================================
// Recording
// ============================================================================

#[tokio::test]
async fn test_record_assigns_sequential_ids() {
    let temp = TempDir::new().unwrap();
    let mut history = ClipboardHistory::open(config(&temp)).await.unwrap();

    assert_eq!(history.record_text("a").await.unwrap(), Some(EntryId::new(1)));
    assert_eq!(history.record_text("b").await.unwrap(), Some(EntryId::new(2)));
    assert_eq!(history.next_id(), EntryId::new(3));
    assert_eq!(history.selected().map(|e| e.text.as_str()), Some("b"));
    assert_eq!(texts(history.recent()), vec!["b", "a"]);
}

#[tokio::test]
async fn test_empty_text_is_ignored() {
    let temp = TempDir::new().unwrap();
    let mut history =
        ClipboardHistory::open(config(&temp).with_strip_text(true)).await.unwrap();

    assert_eq!(history.record_text("").await.unwrap(), None);
    assert_eq!(history.record_text("   \n\t").await.unwrap(), None);
    assert_eq!(history.record_text("\0").await.unwrap(), None);
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_strip_text_trims_before_dedup() {
    let temp = TempDir::new().unwrap();
    let mut history =
        ClipboardHistory::open(config(&temp).with_strip_text(true)).await.unwrap();

    let first = history.record_text("  hello  ").await.unwrap();
    let second = history.record_text("hello\n").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(history.len(), 1);
    assert_eq!(history.get(EntryId::new(1)).unwrap().text, "hello");
}

#[tokio::test]
async fn test_recopy_moves_to_end() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);
    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        history.record_text("a").await.unwrap();
        history.record_text("b").await.unwrap();
        let id = history.record_text("a").await.unwrap();
        assert_eq!(id, Some(EntryId::new(1)));
        assert_eq!(texts(history.recent()), vec!["a", "b"]);
        assert_eq!(history.store().useless_op_count(), 1);
        history.close().await.unwrap();
    }

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert_eq!(texts(history.recent()), vec!["a", "b"]);
    assert_eq!(history.selected().map(|e| e.id), Some(EntryId::new(1)));
}

#[tokio::test]
async fn test_recopy_without_move_keeps_order() {
    let temp = TempDir::new().unwrap();
    let mut history = ClipboardHistory::open(config(&temp).with_move_item_first(false))
        .await
        .unwrap();

    history.record_text("a").await.unwrap();
    history.record_text("b").await.unwrap();
    history.record_text("a").await.unwrap();
    assert_eq!(texts(history.recent()), vec!["b", "a"]);
    assert_eq!(history.selected().map(|e| e.text.as_str()), Some("a"));
    assert_eq!(history.store().useless_op_count(), 0);
}

// ============================================================================
// Pruning and favorites
// ============================================================================

#[tokio::test]
async fn test_oldest_non_favorites_are_pruned() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp).with_history_size(3);
    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        for text in ["1", "2", "3", "4", "5"] {
            history.record_text(text).await.unwrap();
        }
        assert_eq!(texts(history.recent()), vec!["5", "4", "3"]);
        history.close().await.unwrap();
    }

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert_eq!(texts(history.recent()), vec!["5", "4", "3"]);
    assert_eq!(history.next_id(), EntryId::new(6));
}

#[tokio::test]
async fn test_favorites_survive_pruning() {
    let temp = TempDir::new().unwrap();
    let mut history = ClipboardHistory::open(config(&temp).with_history_size(2))
        .await
        .unwrap();

    let pinned = history.record_text("pinned").await.unwrap().unwrap();
    assert!(history.toggle_favorite(pinned).await.unwrap());
    for text in ["a", "b", "c", "d"] {
        history.record_text(text).await.unwrap();
    }

    assert_eq!(texts(history.favorites()), vec!["pinned"]);
    assert_eq!(texts(history.recent()), vec!["d", "c"]);
}

#[tokio::test]
async fn test_toggle_favorite_round_trip() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);
    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        history.record_text("a").await.unwrap();
        history.record_text("b").await.unwrap();
        assert!(history.toggle_favorite(EntryId::new(1)).await.unwrap());
        history.close().await.unwrap();
    }

    let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
    let order: Vec<_> = history
        .entries()
        .iter()
        .map(|e| (e.id.as_u32(), e.text.clone(), e.favorite))
        .collect();
    assert_eq!(
        order,
        vec![(2, "b".to_string(), false), (1, "a".to_string(), true)]
    );

    assert!(!history.toggle_favorite(EntryId::new(1)).await.unwrap());
    history.close().await.unwrap();

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert!(history.favorites().next().is_none());
    // fav 0 + unfav 2 + two moves
    assert_eq!(history.store().useless_op_count(), 4);
}

#[tokio::test]
async fn test_unknown_ids_are_rejected() {
    let temp = TempDir::new().unwrap();
    let mut history = ClipboardHistory::open(config(&temp)).await.unwrap();
    let missing = EntryId::new(42);

    assert!(matches!(
        history.toggle_favorite(missing).await,
        Err(HistoryError::EntryNotFound(id)) if id == missing
    ));
    assert!(matches!(
        history.delete(missing).await,
        Err(HistoryError::EntryNotFound(_))
    ));
    assert!(history.select(missing).is_none());
}

// ============================================================================
// Delete, clear and search
// ============================================================================

#[tokio::test]
async fn test_delete_keeps_id_counter() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);
    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        history.record_text("a").await.unwrap();
        history.record_text("b").await.unwrap();
        let removed = history.delete(EntryId::new(2)).await.unwrap();
        assert_eq!(removed.text, "b");
        assert!(history.selected().is_none());

        // Deleted text can be recorded again as a new entry
        assert_eq!(history.record_text("b").await.unwrap(), Some(EntryId::new(3)));
        history.close().await.unwrap();
    }

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert_eq!(texts(history.recent()), vec!["b", "a"]);
    assert_eq!(history.next_id(), EntryId::new(4));
}

#[tokio::test]
async fn test_clear_keeps_favorites_and_compacts() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);
    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        for text in ["a", "b", "c", "d"] {
            history.record_text(text).await.unwrap();
        }
        history.toggle_favorite(EntryId::new(3)).await.unwrap();
        history.select(EntryId::new(3));

        assert_eq!(history.clear().await.unwrap(), 3);
        assert_eq!(history.len(), 1);
        assert_eq!(history.store().useless_op_count(), 0);

        // The surviving favorite is renumbered to match the rewritten log
        let kept = history.selected().unwrap();
        assert_eq!((kept.id, kept.text.as_str()), (EntryId::new(1), "c"));
        assert_eq!(history.next_id(), EntryId::new(2));

        assert_eq!(history.record_text("e").await.unwrap(), Some(EntryId::new(2)));
        history.close().await.unwrap();
    }

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert_eq!(texts(history.favorites()), vec!["c"]);
    assert_eq!(texts(history.recent()), vec!["e"]);
    assert_eq!(history.get(EntryId::new(2)).map(|e| e.text.as_str()), Some("e"));
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_recent_first() {
    let temp = TempDir::new().unwrap();
    let mut history = ClipboardHistory::open(config(&temp)).await.unwrap();
    for text in ["Hello world", "goodbye", "say HELLO", "hellish"] {
        history.record_text(text).await.unwrap();
    }

    assert_eq!(
        texts(history.search("hello").into_iter()),
        vec!["say HELLO", "Hello world"]
    );
    assert_eq!(texts(history.search("HELL").into_iter()).len(), 3);
    assert_eq!(history.search("").len(), 4);
    assert!(history.search("absent").is_empty());
}

// ============================================================================
// Settings and compaction
// ============================================================================

#[tokio::test]
async fn test_apply_config_prunes_to_new_size() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);
    let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
    for i in 0..10 {
        history.record_text(&format!("clip {}", i)).await.unwrap();
    }

    history
        .apply_config(cfg.with_history_size(4).with_strip_text(true))
        .await
        .unwrap();
    assert_eq!(history.config().history_size, 4);
    assert!(history.config().strip_text);
    assert_eq!(
        texts(history.recent()),
        vec!["clip 9", "clip 8", "clip 7", "clip 6"]
    );
}

#[tokio::test]
async fn test_compaction_renumbers_consistently() {
    let temp = TempDir::new().unwrap();
    let mut storage = StorageConfig::with_data_dir(temp.path())
        .with_sync_on_write(false)
        .with_max_wasted_ops(10);
    storage.flush_every = 3;
    let cfg = config(&temp).with_history_size(5).with_storage(storage);

    let expected = {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        let pinned = history.record_text("pinned").await.unwrap().unwrap();
        history.toggle_favorite(pinned).await.unwrap();

        // Each prune wastes two ops, so compaction runs several times
        for i in 0..40 {
            history.record_text(&format!("clip {}", i)).await.unwrap();
            assert!(history.store().useless_op_count() < 10);
        }

        // Ids in memory are exactly what a replay would assign
        let ids: Vec<u32> = history.entries().ids().map(EntryId::as_u32).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(sorted.last().copied(), Some(history.next_id().as_u32() - 1));

        let snapshot: Vec<_> = history
            .entries()
            .iter()
            .map(|e| (e.id, e.text.clone(), e.favorite))
            .collect();
        history.close().await.unwrap();
        snapshot
    };

    let history = ClipboardHistory::open(cfg).await.unwrap();
    let reloaded: Vec<_> = history
        .entries()
        .iter()
        .map(|e| (e.id, e.text.clone(), e.favorite))
        .collect();
    assert_eq!(reloaded, expected);
    assert_eq!(texts(history.favorites()), vec!["pinned"]);
    assert_eq!(history.recent().count(), 5);
}

#[tokio::test]
async fn test_legacy_registry_is_imported() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);
    tokio::fs::write(
        cfg.storage.legacy_path(),
        r#"["one", {"contents": "two", "favorite": true}, "three"]"#,
    )
    .await
    .unwrap();

    let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
    assert_eq!(texts(history.favorites()), vec!["two"]);
    assert_eq!(texts(history.recent()), vec!["three", "one"]);
    assert!(!cfg.storage.legacy_path().exists());

    // Re-copying migrated text reuses its entry
    assert_eq!(history.record_text("one").await.unwrap(), Some(EntryId::new(1)));
    assert_eq!(history.len(), 3);
}

// ============================================================================
// Write failures
// ============================================================================

fn snapshot(history: &ClipboardHistory) -> Vec<(EntryId, String, bool)> {
    history
        .entries()
        .iter()
        .map(|e| (e.id, e.text.clone(), e.favorite))
        .collect()
}

#[tokio::test]
async fn test_failed_save_leaves_history_unchanged() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);
    let log_path = cfg.storage.log_path();
    let parked = temp.path().join("parked.log");

    let expected = {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        history.record_text("a").await.unwrap();

        // A directory in place of the log makes every append fail
        std::fs::rename(&log_path, &parked).unwrap();
        std::fs::create_dir(&log_path).unwrap();
        assert!(history.record_text("b").await.is_err());
        assert_eq!(texts(history.recent()), vec!["a"]);
        assert_eq!(history.next_id(), EntryId::new(2));
        assert!(history.find("b").is_none());
        assert_eq!(history.selected().map(|e| e.text.as_str()), Some("a"));

        std::fs::remove_dir(&log_path).unwrap();
        std::fs::rename(&parked, &log_path).unwrap();

        let c = history.record_text("c").await.unwrap().unwrap();
        assert_eq!(c, EntryId::new(2));
        history.delete(c).await.unwrap();

        let expected = snapshot(&history);
        history.close().await.unwrap();
        expected
    };

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert_eq!(snapshot(&history), expected);
    assert_eq!(texts(history.recent()), vec!["a"]);
}

#[tokio::test]
async fn test_recopy_runs_compaction() {
    let temp = TempDir::new().unwrap();
    let storage = StorageConfig::with_data_dir(temp.path())
        .with_sync_on_write(false)
        .with_max_wasted_ops(1);
    let cfg = config(&temp).with_storage(storage);

    let expected = {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        history.record_text("a").await.unwrap();
        history.record_text("b").await.unwrap();

        // The MOVE reaches the threshold, so the log is rewritten as [b, a]
        let id = history.record_text("a").await.unwrap();
        assert_eq!(history.store().useless_op_count(), 0);
        assert_eq!(id, Some(EntryId::new(2)));
        assert_eq!(history.find("a").map(|e| e.id), id);
        assert_eq!(history.selected().map(|e| e.id), id);

        let expected = snapshot(&history);
        history.close().await.unwrap();
        expected
    };

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert_eq!(snapshot(&history), expected);
}

// ============================================================================
// Private and cache-only-favorites modes
// ============================================================================

#[tokio::test]
async fn test_private_mode_records_nothing() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);
    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        history.record_text("before").await.unwrap();

        history
            .apply_config(cfg.clone().with_private_mode(true))
            .await
            .unwrap();
        assert_eq!(history.record_text("secret").await.unwrap(), None);
        assert!(history.find("secret").is_none());
        assert_eq!(history.len(), 1);
        assert_eq!(history.next_id(), EntryId::new(2));
        history.close().await.unwrap();
    }

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert_eq!(texts(history.recent()), vec!["before"]);
}

#[tokio::test]
async fn test_cache_only_keeps_non_favorites_out_of_the_log() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);
    let cache_only = cfg.clone().with_cache_only_favorites(true).with_history_size(2);

    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        history.record_text("logged").await.unwrap();
        history.close().await.unwrap();
    }

    {
        // Opening in cache-only mode drops logged non-favorites from the log
        let mut history = ClipboardHistory::open(cache_only.clone()).await.unwrap();
        let logged = history.find("logged").unwrap().id;
        assert!(!history.is_logged(logged));

        let id = history.record_text("x").await.unwrap().unwrap();
        assert!(!history.is_logged(id));
        assert_eq!(history.selected().map(|e| e.id), Some(id));
        history.record_text("y").await.unwrap();

        // Pruning memory-only entries logs nothing
        assert_eq!(texts(history.recent()), vec!["y", "x"]);
        assert_eq!(history.next_id(), EntryId::new(2));
        history.close().await.unwrap();
    }

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_cache_only_favorite_toggle_logs_and_unlogs() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp).with_cache_only_favorites(true);

    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        let a = history.record_text("a").await.unwrap().unwrap();
        history.record_text("b").await.unwrap();

        assert!(history.toggle_favorite(a).await.unwrap());
        let a = history.find("a").unwrap().id;
        assert_eq!(a, EntryId::new(1));
        assert!(history.is_logged(a));
        assert_eq!(history.next_id(), EntryId::new(2));
        history.close().await.unwrap();
    }

    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        assert_eq!(texts(history.favorites()), vec!["a"]);
        assert_eq!(history.recent().count(), 0);

        assert!(!history.toggle_favorite(EntryId::new(1)).await.unwrap());
        let a = history.find("a").unwrap();
        assert!(!a.favorite);
        assert!(!history.is_logged(a.id));
        history.close().await.unwrap();
    }

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_cache_only_switching() {
    let temp = TempDir::new().unwrap();
    let cfg = config(&temp);

    {
        let mut history = ClipboardHistory::open(cfg.clone()).await.unwrap();
        history.record_text("a").await.unwrap();
        let b = history.record_text("b").await.unwrap().unwrap();
        history.toggle_favorite(b).await.unwrap();

        history
            .apply_config(cfg.clone().with_cache_only_favorites(true))
            .await
            .unwrap();
        assert!(!history.is_logged(history.find("a").unwrap().id));
        assert!(history.is_logged(history.find("b").unwrap().id));
        assert_eq!(texts(history.recent()), vec!["a"]);

        history.record_text("c").await.unwrap();
        history.record_text("d").await.unwrap();

        // Switching back logs memory-only entries oldest first
        history.apply_config(cfg.clone()).await.unwrap();
        assert_eq!(texts(history.recent()), vec!["d", "c", "a"]);
        assert!(history.entries().iter().all(|e| history.is_logged(e.id)));
        assert_eq!(history.find("a").map(|e| e.id), Some(EntryId::new(3)));
        assert_eq!(history.find("d").map(|e| e.id), Some(EntryId::new(5)));
        assert_eq!(history.next_id(), EntryId::new(6));

        history.close().await.unwrap();
    }

    let history = ClipboardHistory::open(cfg).await.unwrap();
    assert_eq!(texts(history.favorites()), vec!["b"]);
    assert_eq!(texts(history.recent()), vec!["d", "c", "a"]);
    assert_eq!(history.find("c").map(|e| e.id), Some(EntryId::new(4)));
}
