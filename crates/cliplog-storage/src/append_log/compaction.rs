//! Log compaction utilities
//!
//! Tracks how many logged operations have been superseded and turns a
//! snapshot of live entries into the minimal op sequence that rebuilds it.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::codec::LogOp;
use crate::entry::{Entry, EntryId};

/// Wasted operations tolerated before the log is rewritten
pub const MAX_WASTED_OPS: u64 = 500;

/// Records written between flushes while rewriting the log
pub const FLUSH_EVERY: usize = 1000;

/// Counter of superseded ("useless") operations since the last rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WastedOps {
    count: u64,
    threshold: u64,
}

impl Default for WastedOps {
    fn default() -> Self {
        Self::new(MAX_WASTED_OPS)
    }
}

impl WastedOps {
    /// Start at zero with the given compaction threshold
    pub fn new(threshold: u64) -> Self {
        Self { count: 0, threshold }
    }

    /// Current count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Compaction threshold
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Add `n` wasted operations
    pub fn add(&mut self, n: u64) {
        self.count = self.count.saturating_add(n);
    }

    /// Record what `op` wastes
    pub fn record(&mut self, op: &LogOp) {
        self.add(op.wasted_ops());
    }

    /// Whether the count has reached the threshold
    pub fn should_compact(&self) -> bool {
        self.count >= self.threshold
    }

    /// Reset to zero, returning the previous count
    pub fn reset(&mut self) -> u64 {
        std::mem::take(&mut self.count)
    }
}

/// The ops that rebuild a snapshot from an empty log
#[derive(Debug, Clone)]
pub struct CompactionPlan {
    /// Ops in write order
    pub ops: Vec<LogOp>,
    /// Number of entries saved
    pub entries: usize,
    /// Number of those entries marked favorite
    pub favorites: usize,
    /// The id the next saved entry will get after replay
    pub next_id: EntryId,
}

impl CompactionPlan {
    /// Build the plan for `snapshot`, in snapshot order
    ///
    /// Entries are numbered 1..N by position, which is what a replay of the
    /// rewritten log assigns. Favorites are re-pinned right after their save.
    pub fn from_snapshot(snapshot: &[Entry]) -> Self {
        let favorites = snapshot.iter().filter(|entry| entry.favorite).count();
        let mut ops = Vec::with_capacity(snapshot.len() + favorites);
        let mut next_id = EntryId::FIRST;
        let mut mismatched = 0usize;

        for entry in snapshot {
            let id = next_id.take_next();
            if entry.id != id {
                mismatched += 1;
            }
            ops.push(LogOp::save_text(entry.text.as_str()));
            if entry.favorite {
                ops.push(LogOp::FavoriteItem(id));
            }
        }

        if mismatched > 0 {
            warn!(
                mismatched = mismatched,
                entries = snapshot.len(),
                "Snapshot ids are not numbered 1..N in order; the rewritten log renumbers them"
            );
        }

        Self {
            ops,
            entries: snapshot.len(),
            favorites,
            next_id,
        }
    }
}

/// Result of a compaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionResult {
    /// Number of live entries written
    pub entries_written: usize,
    /// Number of favorite records written
    pub favorites_written: usize,
    /// Wasted operations discarded by the rewrite
    pub wasted_ops_discarded: u64,
    /// The id the next saved entry gets
    pub next_id: EntryId,
    /// Timestamp of compaction
    pub compacted_at_millis: i64,
}

impl CompactionResult {
    /// Create a new compaction result
    pub fn new(plan: &CompactionPlan, wasted_ops_discarded: u64) -> Self {
        Self {
            entries_written: plan.entries,
            favorites_written: plan.favorites,
            wasted_ops_discarded,
            next_id: plan.next_id,
            compacted_at_millis: chrono::Utc::now().timestamp_millis(),
        }
    }
}
