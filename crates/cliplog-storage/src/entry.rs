//! Clipboard history entries and their identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a history entry
///
/// Ids are assigned sequentially in the order SAVE_TEXT operations are
/// discovered in the log, starting at [`EntryId::FIRST`]. They are stored on
/// disk as big-endian `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u32);

impl EntryId {
    /// The id given to the first entry of a fresh log
    pub const FIRST: EntryId = EntryId(1);

    /// Wrap a raw id
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw on-disk value
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// The id that follows this one
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Return this id and advance `self` past it
    pub fn take_next(&mut self) -> Self {
        let current = *self;
        *self = current.next();
        current
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EntryId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// A single clipboard history record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique id within the current log generation
    pub id: EntryId,
    /// Clipboard payload
    pub text: String,
    /// Pinned entries are exempt from history-length eviction
    pub favorite: bool,
}

impl Entry {
    /// Create a non-favorite entry
    pub fn new(id: EntryId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            favorite: false,
        }
    }

    /// Set the favorite flag
    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }
}
