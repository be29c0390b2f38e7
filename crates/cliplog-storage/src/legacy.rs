//! Legacy whole-state snapshot (`registry.txt`)
//!
//! Before the operation log existed, history was saved as a JSON array whose
//! elements are either a bare string or `{ "contents": ..., "favorite": ... }`.
//! The snapshot is only ever read, to migrate it into a fresh log.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::entry::{Entry, EntryId};
use crate::error::StorageError;

/// One element of the legacy array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyRecord {
    /// A non-favorite text entry
    Plain(String),
    /// A text entry with its favorite flag
    Detailed {
        /// Clipboard payload
        contents: String,
        /// Pinned flag
        #[serde(default)]
        favorite: bool,
    },
}

impl LegacyRecord {
    fn into_entry(self, id: EntryId) -> Entry {
        match self {
            LegacyRecord::Plain(text) => Entry::new(id, text),
            LegacyRecord::Detailed { contents, favorite } => {
                Entry::new(id, contents).with_favorite(favorite)
            }
        }
    }
}

/// Parse a legacy snapshot into entries numbered 1..N in array order
///
/// A snapshot that is not a JSON array is logged and treated as empty.
/// Elements of an unrecognised shape are skipped.
pub fn parse_legacy_registry(raw: &[u8]) -> Vec<Entry> {
    let values: Vec<serde_json::Value> = match serde_json::from_slice(raw) {
        Ok(values) => values,
        Err(e) => {
            error!(error = %e, "Legacy registry is not a JSON array, ignoring its contents");
            return Vec::new();
        }
    };

    let mut next_id = EntryId::FIRST;
    let mut entries = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<LegacyRecord>(value) {
            Ok(record) => entries.push(record.into_entry(next_id.take_next())),
            Err(e) => warn!(index = index, error = %e, "Skipping unreadable legacy entry"),
        }
    }
    entries
}

/// Read the legacy snapshot at `path`
///
/// Returns `None` when the file does not exist.
pub async fn read_legacy_registry(
    path: impl AsRef<Path>,
) -> Result<Option<Vec<Entry>>, StorageError> {
    let path = path.as_ref();
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No legacy registry");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let entries = parse_legacy_registry(&raw);
    info!(
        path = %path.display(),
        entries = entries.len(),
        "Read legacy registry"
    );
    Ok(Some(entries))
}
