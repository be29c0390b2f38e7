//! Binary encoding of log operations
//!
//! Every record starts with a one-byte tag. Integers are big-endian.
//!
//! ```text
//! SAVE_TEXT        [0x01][utf-8 text, NUL bytes stripped][0x00]
//! DELETE_TEXT      [0x02][id: u32]
//! FAVORITE_ITEM    [0x03][id: u32]
//! UNFAVORITE_ITEM  [0x04][id: u32]
//! MOVE_ITEM_TO_END [0x05][id: u32]
//! ```
//!
//! Tag 0 is never written so that a zero byte can't be mistaken for a record.

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::warn;

use crate::entry::EntryId;
use crate::error::StorageError;

/// Size of an id-carrying record
const ID_RECORD_LEN: usize = 1 + 4;

/// One-byte record tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpTag {
    /// Save a new text entry
    SaveText = 1,
    /// Delete an entry
    DeleteText = 2,
    /// Pin an entry
    FavoriteItem = 3,
    /// Unpin an entry
    UnfavoriteItem = 4,
    /// Move an entry to the most-recent end
    MoveItemToEnd = 5,
}

impl TryFrom<u8> for OpTag {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(OpTag::SaveText),
            2 => Ok(OpTag::DeleteText),
            3 => Ok(OpTag::FavoriteItem),
            4 => Ok(OpTag::UnfavoriteItem),
            5 => Ok(OpTag::MoveItemToEnd),
            other => Err(other),
        }
    }
}

/// A single operation in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOp {
    /// Save a new entry; its id is implied by its position in the log
    SaveText(String),
    /// Delete the entry with this id
    DeleteText(EntryId),
    /// Mark the entry as favorite
    FavoriteItem(EntryId),
    /// Clear the entry's favorite flag
    UnfavoriteItem(EntryId),
    /// Move the entry to the most-recent end
    MoveItemToEnd(EntryId),
}

impl LogOp {
    /// Build a SAVE_TEXT op
    pub fn save_text(text: impl Into<String>) -> Self {
        LogOp::SaveText(text.into())
    }

    /// Build a FAVORITE_ITEM or UNFAVORITE_ITEM op
    pub fn favorite(id: EntryId, favorite: bool) -> Self {
        if favorite {
            LogOp::FavoriteItem(id)
        } else {
            LogOp::UnfavoriteItem(id)
        }
    }

    /// The record tag
    pub fn tag(&self) -> OpTag {
        match self {
            LogOp::SaveText(_) => OpTag::SaveText,
            LogOp::DeleteText(_) => OpTag::DeleteText,
            LogOp::FavoriteItem(_) => OpTag::FavoriteItem,
            LogOp::UnfavoriteItem(_) => OpTag::UnfavoriteItem,
            LogOp::MoveItemToEnd(_) => OpTag::MoveItemToEnd,
        }
    }

    /// The id this op refers to, if any
    pub fn target(&self) -> Option<EntryId> {
        match self {
            LogOp::SaveText(_) => None,
            LogOp::DeleteText(id)
            | LogOp::FavoriteItem(id)
            | LogOp::UnfavoriteItem(id)
            | LogOp::MoveItemToEnd(id) => Some(*id),
        }
    }

    /// How many earlier records this op makes redundant
    ///
    /// A delete wastes itself and the save it cancels. An unfavorite
    /// usually cancels a favorite. A move wastes itself.
    pub fn wasted_ops(&self) -> u64 {
        match self {
            LogOp::SaveText(_) | LogOp::FavoriteItem(_) => 0,
            LogOp::DeleteText(_) | LogOp::UnfavoriteItem(_) => 2,
            LogOp::MoveItemToEnd(_) => 1,
        }
    }

    /// Number of bytes [`encode`](Self::encode) will write
    pub fn encoded_len(&self) -> usize {
        match self {
            LogOp::SaveText(text) => 1 + normalized_text(text).len() + 1,
            _ => ID_RECORD_LEN,
        }
    }

    /// Append the encoded record to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u8(self.tag() as u8);
        match self {
            LogOp::SaveText(text) => {
                buf.put_slice(normalized_text(text).as_bytes());
                buf.put_u8(0);
            }
            LogOp::DeleteText(id)
            | LogOp::FavoriteItem(id)
            | LogOp::UnfavoriteItem(id)
            | LogOp::MoveItemToEnd(id) => buf.put_u32(id.as_u32()),
        }
    }

    /// Encode a sequence of ops into one buffer
    pub fn encode_all<'a>(ops: impl IntoIterator<Item = &'a LogOp>) -> BytesMut {
        let mut buf = BytesMut::new();
        for op in ops {
            op.encode(&mut buf);
        }
        buf
    }
}

/// Remove NUL bytes, which would otherwise terminate the record early
pub fn normalized_text(text: &str) -> Cow<'_, str> {
    if text.contains('\0') {
        Cow::Owned(text.replace('\0', ""))
    } else {
        Cow::Borrowed(text)
    }
}

/// Result of reading one record from a log stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete record and the number of bytes it occupied
    Op {
        /// The decoded op
        op: LogOp,
        /// Encoded size in bytes
        len: u64,
    },
    /// Clean end of stream
    End,
    /// The stream ended part-way through a record
    Truncated,
    /// The tag byte is not a known op
    UnknownTag(u8),
}

/// Read the next record from `reader`
///
/// Only genuine I/O failures are errors. A short or unrecognised tail is
/// reported through [`ReadOutcome`] so the caller can keep what it has.
pub async fn read_op<R>(reader: &mut R) -> Result<ReadOutcome, StorageError>
where
    R: AsyncBufRead + Unpin,
{
    let tag = {
        let available = reader.fill_buf().await?;
        match available.first() {
            Some(&tag) => tag,
            None => return Ok(ReadOutcome::End),
        }
    };
    reader.consume(1);

    let tag = match OpTag::try_from(tag) {
        Ok(tag) => tag,
        Err(unknown) => return Ok(ReadOutcome::UnknownTag(unknown)),
    };

    let make: fn(EntryId) -> LogOp = match tag {
        OpTag::SaveText => return read_save_text(reader).await,
        OpTag::DeleteText => LogOp::DeleteText,
        OpTag::FavoriteItem => LogOp::FavoriteItem,
        OpTag::UnfavoriteItem => LogOp::UnfavoriteItem,
        OpTag::MoveItemToEnd => LogOp::MoveItemToEnd,
    };

    let mut id_buf = [0u8; 4];
    match reader.read_exact(&mut id_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Ok(ReadOutcome::Truncated);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(ReadOutcome::Op {
        op: make(EntryId::new(u32::from_be_bytes(id_buf))),
        len: ID_RECORD_LEN as u64,
    })
}

async fn read_save_text<R>(reader: &mut R) -> Result<ReadOutcome, StorageError>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = Vec::new();
    reader.read_until(0, &mut raw).await?;
    if raw.pop() != Some(0) {
        return Ok(ReadOutcome::Truncated);
    }

    let len = 1 + raw.len() as u64 + 1;
    let text = String::from_utf8(raw).unwrap_or_else(|err| {
        warn!(error = %err, "Saved text is not valid UTF-8, decoding lossily");
        String::from_utf8_lossy(&err.into_bytes()).into_owned()
    });

    Ok(ReadOutcome::Op {
        op: LogOp::SaveText(text),
        len,
    })
}
