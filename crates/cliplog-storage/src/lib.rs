//! # Cliplog Storage
//!
//! Durable storage for clipboard history.
//!
//! History is kept as an append-only binary log of operations: each save,
//! delete, favorite change or move appends one small record. Startup replays
//! the log to rebuild the history. Records made redundant by later ones are
//! counted, and once enough pile up the log is rewritten from live state.
//!
//! ## Features
//!
//! - **EntryList**: Id-indexed doubly linked list with O(1) lookup, insert,
//!   detach and move-to-end
//! - **ClipboardStore**: Loads state, logs mutations, decides on compaction
//! - **LogWriter**: Single background task that serialises all file writes
//! - **Legacy migration**: A JSON snapshot from older versions is imported
//!   into a fresh log on first start
//!
//! ## Example
//!
//! ```rust,ignore
//! use cliplog_storage::{ClipboardStore, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cliplog_storage::StorageError> {
//!     let mut store = ClipboardStore::init(StorageConfig::default()).await?;
//!     let mut state = store.build_state_from_log().await?;
//!
//!     let id = state.next_id.take_next();
//!     store.store_text_entry("copied text").wait().await?;
//!     store.update_favorite_status(id, true).wait().await?;
//!
//!     store.close().await
//! }
//! ```

pub mod append_log;
pub mod config;
pub mod entry;
pub mod error;
pub mod legacy;
pub mod list;
pub mod store;

// Re-exports
pub use append_log::{
    ClipboardState, CompactionResult, LogOp, LogWriter, ReplayOutcome, ReplayStop, WriteTicket,
    normalized_text,
};
pub use config::StorageConfig;
pub use entry::{Entry, EntryId};
pub use error::StorageError;
pub use list::EntryList;
pub use store::{ClipboardStore, PendingCompaction};
