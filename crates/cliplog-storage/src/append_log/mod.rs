//! Append-only operation log
//!
//! The log is the durable source of truth for clipboard history; the
//! in-memory list is derived from it by replay.
//!
//! ## Features
//!
//! - Records are only ever appended, one per history mutation
//! - A single writer task serialises appends so records never interleave
//! - Replay tolerates a truncated or corrupt tail
//! - Superseded records are counted and the log is rewritten from live
//!   state once enough of them pile up
//!
//! ## Storage Format
//!
//! No header, footer or checksum. Each record is a tag byte followed by its
//! payload; see [`codec`] for the layouts.

pub mod codec;
pub mod compaction;
pub mod replay;
pub mod writer;

pub use codec::{LogOp, OpTag, ReadOutcome, normalized_text, read_op};
pub use compaction::{CompactionPlan, CompactionResult, FLUSH_EVERY, MAX_WASTED_OPS, WastedOps};
pub use replay::{ClipboardState, ReplayOutcome, ReplayStop, replay, replay_file};
pub use writer::{LogWriter, WriteTicket};
