//! Ordered entry list with O(1) lookup by id
//!
//! [`EntryList`] is a doubly-linked list whose links are entry ids rather
//! than pointers. Every node lives in a single `HashMap` keyed by id, so the
//! map doubles as the id index: lookup, detach, append and re-insertion are
//! all O(1) and no node ever holds a reference to another.
//!
//! The list is ordered oldest → newest. The tail is the most-recently-used
//! end, which is where "move to end" puts an entry.

use std::collections::HashMap;
use std::iter::FusedIterator;

use crate::entry::{Entry, EntryId};

#[derive(Debug, Clone)]
struct Node {
    entry: Entry,
    prev: Option<EntryId>,
    next: Option<EntryId>,
}

/// Ordered, id-indexed collection of entries
#[derive(Debug, Clone, Default)]
pub struct EntryList {
    nodes: HashMap<EntryId, Node>,
    head: Option<EntryId>,
    tail: Option<EntryId>,
}

impl EntryList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in the list
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the list has no entries
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First (oldest) entry
    pub fn head(&self) -> Option<&Entry> {
        self.head.and_then(|id| self.get(id))
    }

    /// Last (most recent) entry
    pub fn tail(&self) -> Option<&Entry> {
        self.tail.and_then(|id| self.get(id))
    }

    /// Whether an entry with this id is in the list
    pub fn contains(&self, id: EntryId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up an entry by id
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.nodes.get(&id).map(|node| &node.entry)
    }

    /// Look up an entry by id for in-place mutation
    ///
    /// The id itself must not be changed through this reference.
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.nodes.get_mut(&id).map(|node| &mut node.entry)
    }

    /// Append an entry at the tail
    ///
    /// An entry already in the list under the same id is detached first and
    /// replaced.
    pub fn push_back(&mut self, entry: Entry) -> &mut Entry {
        let id = entry.id;
        self.detach(id);

        let prev = self.tail;
        match prev {
            Some(prev_id) => self.set_next(prev_id, Some(id)),
            None => self.head = Some(id),
        }
        self.tail = Some(id);

        self.link(Node {
            entry,
            prev,
            next: None,
        })
    }

    /// Prepend an entry at the head
    ///
    /// An entry already in the list under the same id is detached first and
    /// replaced.
    pub fn push_front(&mut self, entry: Entry) -> &mut Entry {
        let id = entry.id;
        self.detach(id);

        let next = self.head;
        match next {
            Some(next_id) => self.set_prev(next_id, Some(id)),
            None => self.tail = Some(id),
        }
        self.head = Some(id);

        self.link(Node {
            entry,
            prev: None,
            next,
        })
    }

    /// Insert `entry` directly after the entry `anchor`
    ///
    /// Fails, handing the entry back, when `anchor` is not in the list or is
    /// the entry being inserted.
    pub fn insert_after(&mut self, anchor: EntryId, entry: Entry) -> Result<&mut Entry, Entry> {
        if anchor == entry.id || !self.contains(anchor) {
            return Err(entry);
        }

        let id = entry.id;
        self.detach(id);

        let next = self.nodes.get(&anchor).and_then(|node| node.next);
        self.set_next(anchor, Some(id));
        match next {
            Some(next_id) => self.set_prev(next_id, Some(id)),
            None => self.tail = Some(id),
        }

        Ok(self.link(Node {
            entry,
            prev: Some(anchor),
            next,
        }))
    }

    /// Insert `entry` directly before the entry `anchor`
    ///
    /// Fails, handing the entry back, when `anchor` is not in the list or is
    /// the entry being inserted.
    pub fn insert_before(&mut self, anchor: EntryId, entry: Entry) -> Result<&mut Entry, Entry> {
        if anchor == entry.id || !self.contains(anchor) {
            return Err(entry);
        }

        let id = entry.id;
        self.detach(id);

        let prev = self.nodes.get(&anchor).and_then(|node| node.prev);
        self.set_prev(anchor, Some(id));
        match prev {
            Some(prev_id) => self.set_next(prev_id, Some(id)),
            None => self.head = Some(id),
        }

        Ok(self.link(Node {
            entry,
            prev,
            next: Some(anchor),
        }))
    }

    /// Remove an entry from the list and return it
    ///
    /// Returns `None` and leaves the list untouched when the id is absent.
    pub fn detach(&mut self, id: EntryId) -> Option<Entry> {
        let node = self.nodes.remove(&id)?;

        match node.prev {
            Some(prev_id) => self.set_next(prev_id, node.next),
            None => self.head = node.next,
        }
        match node.next {
            Some(next_id) => self.set_prev(next_id, node.prev),
            None => self.tail = node.prev,
        }

        Some(node.entry)
    }

    /// Move an entry to the tail (most-recently-used end)
    ///
    /// Returns `false` when the id is absent. Moving the current tail is a
    /// no-op.
    pub fn move_to_back(&mut self, id: EntryId) -> bool {
        if self.tail == Some(id) {
            return true;
        }
        match self.detach(id) {
            Some(entry) => {
                self.push_back(entry);
                true
            }
            None => false,
        }
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterate from head to tail
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.nodes.len(),
        }
    }

    /// Ids from head to tail
    pub fn ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.iter().map(|entry| entry.id)
    }

    /// Clone the entries into a vector, head first
    pub fn to_vec(&self) -> Vec<Entry> {
        self.iter().cloned().collect()
    }

    /// Consume the list, returning its entries head first
    pub fn into_vec(mut self) -> Vec<Entry> {
        let mut entries = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            match self.nodes.remove(&id) {
                Some(node) => {
                    cursor = node.next;
                    entries.push(node.entry);
                }
                None => break,
            }
        }
        entries
    }

    fn link(&mut self, node: Node) -> &mut Entry {
        let id = node.entry.id;
        &mut self.nodes.entry(id).insert_entry(node).into_mut().entry
    }

    fn set_next(&mut self, id: EntryId, next: Option<EntryId>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.next = next;
        }
    }

    fn set_prev(&mut self, id: EntryId, prev: Option<EntryId>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.prev = prev;
        }
    }
}

/// Borrowing iterator over an [`EntryList`]
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    list: &'a EntryList,
    front: Option<EntryId>,
    back: Option<EntryId>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.nodes.get(&self.front?)?;
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.nodes.get(&self.back?)?;
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.entry)
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a EntryList {
    type Item = &'a Entry;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<Entry> for EntryList {
    fn extend<T: IntoIterator<Item = Entry>>(&mut self, iter: T) {
        for entry in iter {
            self.push_back(entry);
        }
    }
}

impl FromIterator<Entry> for EntryList {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        let mut list = EntryList::new();
        list.extend(iter);
        list
    }
}
