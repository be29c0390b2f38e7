//! Rebuilding clipboard state from the operation log
//!
//! Replay applies every record in file order to an empty [`EntryList`] and
//! an id counter starting at 1. A damaged tail ends the replay early but is
//! never fatal: whatever was rebuilt up to that point is returned.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info, instrument, warn};

use super::codec::{LogOp, ReadOutcome, read_op};
use crate::entry::{Entry, EntryId};
use crate::error::StorageError;
use crate::list::EntryList;

/// Materialised clipboard history
#[derive(Debug, Clone, Default)]
pub struct ClipboardState {
    /// Entries, oldest first
    pub entries: EntryList,
    /// The id the next saved entry gets
    pub next_id: EntryId,
}

impl ClipboardState {
    /// Build a state from entries that already carry their ids
    ///
    /// `next_id` is one past the largest id present.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let entries: EntryList = entries.into_iter().collect();
        let next_id = entries
            .ids()
            .max()
            .map(EntryId::next)
            .unwrap_or(EntryId::FIRST);
        Self { entries, next_id }
    }

    /// Apply one op
    ///
    /// Returns `false` when the op names an id that is not live; such ops
    /// leave the state untouched.
    pub fn apply(&mut self, op: LogOp) -> bool {
        match op {
            LogOp::SaveText(text) => {
                let id = self.next_id.take_next();
                self.entries.push_back(Entry::new(id, text));
                true
            }
            LogOp::DeleteText(id) => self.entries.detach(id).is_some(),
            LogOp::FavoriteItem(id) => self.set_favorite(id, true),
            LogOp::UnfavoriteItem(id) => self.set_favorite(id, false),
            LogOp::MoveItemToEnd(id) => self.entries.move_to_back(id),
        }
    }

    /// Consume the state, returning entries oldest first and the next id
    pub fn into_parts(self) -> (Vec<Entry>, EntryId) {
        (self.entries.into_vec(), self.next_id)
    }

    fn set_favorite(&mut self, id: EntryId, favorite: bool) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.favorite = favorite;
                true
            }
            None => false,
        }
    }
}

/// Why a replay stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStop {
    /// Every record was read
    EndOfLog,
    /// The last record was cut short
    Truncated {
        /// Offset of the partial record
        offset: u64,
    },
    /// A record had an unknown tag
    UnknownTag {
        /// The offending tag byte
        tag: u8,
        /// Offset of the record
        offset: u64,
    },
}

/// Everything a replay produced
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    /// The rebuilt state
    pub state: ClipboardState,
    /// Superseded operations found in the log
    pub wasted_ops: u64,
    /// Records applied
    pub ops_applied: usize,
    /// Records skipped because their id was not live
    pub ops_skipped: usize,
    /// Bytes consumed by complete records
    pub bytes_read: u64,
    /// Why replay ended
    pub stop: ReplayStop,
}

/// Replay a log stream
pub async fn replay<R>(reader: &mut R) -> Result<ReplayOutcome, StorageError>
where
    R: AsyncBufRead + Unpin,
{
    let mut state = ClipboardState::default();
    let mut wasted_ops = 0u64;
    let mut ops_applied = 0usize;
    let mut ops_skipped = 0usize;
    let mut offset = 0u64;

    let stop = loop {
        match read_op(reader).await? {
            ReadOutcome::Op { op, len } => {
                wasted_ops += op.wasted_ops();
                let target = op.target();
                let tag = op.tag();
                if state.apply(op) {
                    ops_applied += 1;
                } else {
                    ops_skipped += 1;
                    warn!(
                        offset = offset,
                        op = ?tag,
                        id = ?target,
                        "Log references an entry that is not live, skipping"
                    );
                }
                offset += len;
            }
            ReadOutcome::End => break ReplayStop::EndOfLog,
            ReadOutcome::Truncated => {
                warn!(offset = offset, "Truncated log record, stopping replay");
                break ReplayStop::Truncated { offset };
            }
            ReadOutcome::UnknownTag(tag) => {
                warn!(offset = offset, tag = tag, "Unknown op type, stopping replay");
                break ReplayStop::UnknownTag { tag, offset };
            }
        }
    };

    Ok(ReplayOutcome {
        state,
        wasted_ops,
        ops_applied,
        ops_skipped,
        bytes_read: offset,
        stop,
    })
}

/// Replay the log at `path`
///
/// Returns `None` when the file does not exist.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn replay_file(path: impl AsRef<Path>) -> Result<Option<ReplayOutcome>, StorageError> {
    let file = match File::open(path.as_ref()).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No log file");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let outcome = replay(&mut reader).await?;

    info!(
        entries = outcome.state.entries.len(),
        next_id = %outcome.state.next_id,
        applied = outcome.ops_applied,
        skipped = outcome.ops_skipped,
        wasted_ops = outcome.wasted_ops,
        "Replayed log"
    );

    Ok(Some(outcome))
}
