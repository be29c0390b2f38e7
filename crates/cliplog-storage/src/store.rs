//! The clipboard log store
//!
//! [`ClipboardStore`] is the storage engine the history layer talks to. It
//! loads state at startup and appends one record per history mutation. It
//! also decides when superseded records have piled up enough to rewrite
//! the log.
//!
//! Mutations never touch an in-memory list: the caller keeps its own
//! [`EntryList`](crate::EntryList) in step and only hands the store the
//! operations and, at compaction time, a snapshot.

use std::path::PathBuf;

use tracing::{debug, info, instrument, trace, warn};

use crate::append_log::compaction::{CompactionPlan, CompactionResult, WastedOps};
use crate::append_log::replay::{ClipboardState, replay_file};
use crate::append_log::{LogOp, LogWriter, WriteTicket};
use crate::config::StorageConfig;
use crate::entry::{Entry, EntryId};
use crate::error::StorageError;
use crate::legacy::read_legacy_registry;

/// A queued log rewrite
#[must_use = "a PendingCompaction carries the only report of a failed rewrite"]
#[derive(Debug)]
pub struct PendingCompaction {
    result: CompactionResult,
    ticket: WriteTicket,
}

impl PendingCompaction {
    /// What the rewrite will contain
    pub fn result(&self) -> &CompactionResult {
        &self.result
    }

    /// Wait for the rewrite to reach the disk
    pub async fn wait(self) -> Result<CompactionResult, StorageError> {
        self.ticket.wait().await?;
        Ok(self.result)
    }
}

/// Append-only, compacting clipboard log
#[derive(Debug)]
pub struct ClipboardStore {
    config: StorageConfig,
    writer: LogWriter,
    wasted: WastedOps,
}

impl ClipboardStore {
    /// Create the data directory and start the log writer
    #[instrument(skip_all, fields(data_dir = %config.data_dir.display()))]
    pub async fn init(config: StorageConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let writer = LogWriter::spawn(&config);
        let wasted = WastedOps::new(config.max_wasted_ops);

        debug!("Clipboard store ready");
        Ok(Self {
            config,
            writer,
            wasted,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Path of the operation log
    pub fn log_path(&self) -> PathBuf {
        self.config.log_path()
    }

    /// Path of the legacy snapshot
    pub fn legacy_path(&self) -> PathBuf {
        self.config.legacy_path()
    }

    /// Superseded operations logged since the last rewrite
    pub fn useless_op_count(&self) -> u64 {
        self.wasted.count()
    }

    /// Load the history
    ///
    /// Replays the log. Without a log, the legacy snapshot is migrated into
    /// a fresh log and deleted. Without either, the history is empty.
    #[instrument(skip_all)]
    pub async fn build_state_from_log(&mut self) -> Result<ClipboardState, StorageError> {
        self.wasted.reset();

        if let Some(outcome) = replay_file(self.log_path()).await? {
            self.wasted.add(outcome.wasted_ops);
            return Ok(outcome.state);
        }

        self.migrate_legacy().await
    }

    async fn migrate_legacy(&mut self) -> Result<ClipboardState, StorageError> {
        let legacy_path = self.legacy_path();
        let Some(entries) = read_legacy_registry(&legacy_path).await? else {
            debug!("Starting with an empty history");
            return Ok(ClipboardState::default());
        };

        let state = ClipboardState::from_entries(entries);
        let snapshot = state.entries.to_vec();
        let result = self.reset_database(move || snapshot).wait().await?;

        if let Err(e) = tokio::fs::remove_file(&legacy_path).await {
            warn!(path = %legacy_path.display(), error = %e, "Failed to delete legacy registry");
        }

        info!(
            entries = result.entries_written,
            favorites = result.favorites_written,
            "Migrated legacy registry to the operation log"
        );
        Ok(state)
    }

    /// Log a newly saved entry
    ///
    /// The entry's id is the caller's next id; the log does not store it.
    pub fn store_text_entry(&mut self, text: &str) -> WriteTicket {
        self.record(LogOp::save_text(text))
    }

    /// Log the deletion of an entry
    pub fn delete_text_entry(&mut self, id: EntryId) -> WriteTicket {
        self.record(LogOp::DeleteText(id))
    }

    /// Log a change of an entry's favorite flag
    pub fn update_favorite_status(&mut self, id: EntryId, favorite: bool) -> WriteTicket {
        self.record(LogOp::favorite(id, favorite))
    }

    /// Log a move of an entry to the most-recent end
    pub fn move_entry_to_end(&mut self, id: EntryId) -> WriteTicket {
        self.record(LogOp::MoveItemToEnd(id))
    }

    fn record(&mut self, op: LogOp) -> WriteTicket {
        self.wasted.record(&op);
        trace!(op = ?op.tag(), id = ?op.target(), useless_ops = self.wasted.count(), "Logging op");
        self.writer.append(op)
    }

    /// Rewrite the log if enough operations have been superseded
    ///
    /// `snapshot` is only called when a rewrite happens.
    pub fn maybe_perform_log_compaction<F>(&mut self, snapshot: F) -> Option<PendingCompaction>
    where
        F: FnOnce() -> Vec<Entry>,
    {
        if self.wasted.should_compact() {
            Some(self.reset_database(snapshot))
        } else {
            None
        }
    }

    /// Replace the log with the minimal records rebuilding `snapshot`
    ///
    /// The snapshot is taken now, so it reflects exactly the operations
    /// queued before this call. Its order is the order the next load
    /// produces, and entries are renumbered 1..N in that order.
    #[instrument(skip_all)]
    pub fn reset_database<F>(&mut self, snapshot: F) -> PendingCompaction
    where
        F: FnOnce() -> Vec<Entry>,
    {
        let discarded = self.wasted.reset();
        let entries = snapshot();
        let plan = CompactionPlan::from_snapshot(&entries);
        let result = CompactionResult::new(&plan, discarded);

        info!(
            entries = result.entries_written,
            favorites = result.favorites_written,
            discarded = discarded,
            "Compacting log"
        );

        let ticket = self.writer.rewrite(plan.ops);
        PendingCompaction { result, ticket }
    }

    /// Wait until every queued write has finished
    pub async fn flush(&self) -> Result<(), StorageError> {
        self.writer.flush().await
    }

    /// Drain pending writes and stop the writer
    pub async fn close(self) -> Result<(), StorageError> {
        self.writer.close().await
    }
}
