//! Clipboard history manager
//!
//! [`ClipboardHistory`] owns the in-memory [`EntryList`] and keeps it in step
//! with the operation log. The list is ordered oldest → newest, so the tail
//! is the most recently copied entry.
//!
//! Whenever the log is rewritten, logged entries are renumbered 1..N in
//! snapshot order (favorites first, then the rest, each oldest → newest). The
//! list is rebuilt the same way so that ids in memory always match the ids a
//! replay of the log would assign.
//!
//! In cache-only-favorites mode non-favorite entries live in memory only.
//! They take ids counting down from `u32::MAX`, which never collide with the
//! ids the log assigns.

use std::collections::{HashMap, HashSet};

use cliplog_storage::{
    ClipboardStore, CompactionResult, Entry, EntryId, EntryList, PendingCompaction, StorageError,
    WriteTicket, normalized_text,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::HistoryConfig;
use crate::error::{HistoryError, HistoryResult};

/// Clipboard history backed by the operation log
#[derive(Debug)]
pub struct ClipboardHistory {
    config: HistoryConfig,
    store: ClipboardStore,
    entries: EntryList,
    next_id: EntryId,
    lookup: HashMap<String, EntryId>,
    selected: Option<EntryId>,
    /// Entries with no SAVE_TEXT in the log
    unlogged: HashSet<EntryId>,
    next_unlogged: EntryId,
}

impl ClipboardHistory {
    /// Open the history, replaying the log (or migrating a legacy snapshot)
    ///
    /// With cache-only-favorites set, non-favorites found in the log are
    /// deleted from it and kept in memory only.
    #[instrument(skip_all, fields(data_dir = %config.storage.data_dir.display()))]
    pub async fn open(config: HistoryConfig) -> HistoryResult<Self> {
        let config = config.normalized();
        let mut store = ClipboardStore::init(config.storage.clone()).await?;
        let state = store.build_state_from_log().await?;

        let mut lookup = HashMap::with_capacity(state.entries.len());
        for entry in &state.entries {
            if let Some(previous) = lookup.insert(entry.text.clone(), entry.id) {
                debug!(kept = %entry.id, shadowed = %previous, "Duplicate text in history");
            }
        }
        let selected = state.entries.tail().map(|entry| entry.id);

        info!(
            entries = state.entries.len(),
            next_id = %state.next_id,
            useless_ops = store.useless_op_count(),
            "Opened clipboard history"
        );

        let mut history = Self {
            config,
            store,
            entries: state.entries,
            next_id: state.next_id,
            lookup,
            selected,
            unlogged: HashSet::new(),
            next_unlogged: EntryId::new(u32::MAX),
        };
        if history.config.cache_only_favorites {
            history.unlog_non_favorites().await?;
            history.maybe_compact().await?;
        }
        Ok(history)
    }

    /// Settings in use
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// The underlying log store
    pub fn store(&self) -> &ClipboardStore {
        &self.store
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &EntryList {
        &self.entries
    }

    /// Number of entries, favorites included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The id the next logged entry gets
    pub fn next_id(&self) -> EntryId {
        self.next_id
    }

    /// Look up an entry
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// The entry holding exactly `text`
    pub fn find(&self, text: &str) -> Option<&Entry> {
        self.lookup.get(text).and_then(|&id| self.entries.get(id))
    }

    /// Whether an entry is recorded in the log
    pub fn is_logged(&self, id: EntryId) -> bool {
        self.entries.contains(id) && !self.unlogged.contains(&id)
    }

    /// Favorite entries, most recent first
    pub fn favorites(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.iter().rev().filter(|entry| entry.favorite)
    }

    /// Non-favorite entries, most recent first
    pub fn recent(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.iter().rev().filter(|entry| !entry.favorite)
    }

    /// Entries whose text contains `query`, ignoring case, most recent first
    ///
    /// An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Entry> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .rev()
            .filter(|entry| needle.is_empty() || entry.text.to_lowercase().contains(&needle))
            .collect()
    }

    /// The entry currently on the clipboard, if known
    pub fn selected(&self) -> Option<&Entry> {
        self.selected.and_then(|id| self.entries.get(id))
    }

    /// Mark an entry as the current clipboard content
    pub fn select(&mut self, id: EntryId) -> Option<&Entry> {
        let entry = self.entries.get(id)?;
        self.selected = Some(id);
        Some(entry)
    }

    /// Record newly copied text
    ///
    /// Returns the id of the entry now holding the text, or `None` when the
    /// text is empty after normalisation or private mode is on. Text already
    /// in the history is not duplicated; it is selected and, if configured,
    /// moved to the most-recent end.
    ///
    /// A new entry only enters the history once its SAVE_TEXT is on disk.
    pub async fn record_text(&mut self, text: &str) -> HistoryResult<Option<EntryId>> {
        if self.config.private_mode {
            trace!("Private mode, not recording");
            return Ok(None);
        }

        let text = if self.config.strip_text {
            text.trim()
        } else {
            text
        };
        let text = normalized_text(text).into_owned();
        if text.is_empty() {
            trace!("Ignoring empty clipboard text");
            return Ok(None);
        }

        if let Some(&id) = self.lookup.get(&text) {
            self.selected = Some(id);
            if self.config.move_item_first {
                self.entries.move_to_back(id);
                if !self.unlogged.contains(&id) {
                    let ticket = self.store.move_entry_to_end(id);
                    self.commit(vec![ticket]).await?;
                    self.maybe_compact().await?;
                }
                trace!(id = %id, "Moved re-copied entry to the end");
            }
            // Compaction may have renumbered the entry
            return Ok(self.lookup.get(&text).copied());
        }

        let id = if self.config.cache_only_favorites {
            self.allocate_unlogged()
        } else {
            let ticket = self.store.store_text_entry(&text);
            self.commit(vec![ticket]).await?;
            self.next_id.take_next()
        };
        self.entries.push_back(Entry::new(id, text.clone()));
        self.lookup.insert(text.clone(), id);
        self.selected = Some(id);
        debug!(id = %id, len = text.len(), logged = self.is_logged(id), "Recorded clipboard text");

        self.prune().await?;
        self.maybe_compact().await?;

        Ok(self.lookup.get(&text).copied())
    }

    /// Flip an entry's favorite flag and move it to the most-recent end
    ///
    /// Returns the new flag. In cache-only-favorites mode the entry changes
    /// id: favoriting logs it under a new id and unfavoriting removes it from
    /// the log. Use [`find`](Self::find) to locate it afterwards.
    pub async fn toggle_favorite(&mut self, id: EntryId) -> HistoryResult<bool> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or(HistoryError::EntryNotFound(id))?;
        entry.favorite = !entry.favorite;
        let favorite = entry.favorite;
        self.entries.move_to_back(id);

        if self.unlogged.contains(&id) {
            if favorite {
                self.log_entry(id).await?;
            }
        } else if self.config.cache_only_favorites && !favorite {
            let ticket = self.store.delete_text_entry(id);
            self.commit(vec![ticket]).await?;
            self.unlog(id);
        } else {
            let tickets = vec![
                self.store.update_favorite_status(id, favorite),
                self.store.move_entry_to_end(id),
            ];
            self.commit(tickets).await?;
        }
        debug!(id = %id, favorite = favorite, "Toggled favorite");

        self.maybe_compact().await?;
        Ok(favorite)
    }

    /// Delete an entry
    pub async fn delete(&mut self, id: EntryId) -> HistoryResult<Entry> {
        let logged = self.is_logged(id);
        let entry = self.remove(id).ok_or(HistoryError::EntryNotFound(id))?;
        if logged {
            let ticket = self.store.delete_text_entry(id);
            self.commit(vec![ticket]).await?;
        }
        debug!(id = %id, logged = logged, "Deleted entry");

        self.maybe_compact().await?;
        Ok(entry)
    }

    /// Delete every non-favorite entry and rewrite the log
    ///
    /// Returns the number of entries removed.
    pub async fn clear(&mut self) -> HistoryResult<usize> {
        let doomed: Vec<EntryId> = self.recent().map(|entry| entry.id).collect();
        for &id in &doomed {
            self.remove(id);
        }

        let (entries, unlogged) = (&self.entries, &self.unlogged);
        let pending = self
            .store
            .reset_database(|| snapshot_order(entries, unlogged));
        self.finish_rewrite(pending).await?;

        info!(removed = doomed.len(), kept = self.entries.len(), "Cleared history");
        Ok(doomed.len())
    }

    /// Apply new settings and prune to the new history size
    ///
    /// Switching cache-only-favorites on deletes logged non-favorites from
    /// the log; switching it off logs every memory-only entry, oldest first.
    /// Storage settings only take effect when the history is reopened.
    pub async fn apply_config(&mut self, config: HistoryConfig) -> HistoryResult<()> {
        if config.storage != self.config.storage {
            warn!("Storage settings changed; they apply after reopening the history");
        }
        let was_cache_only = self.config.cache_only_favorites;
        let storage = self.config.storage.clone();
        self.config = HistoryConfig { storage, ..config }.normalized();

        match (was_cache_only, self.config.cache_only_favorites) {
            (false, true) => self.unlog_non_favorites().await?,
            (true, false) => self.log_unlogged_entries().await?,
            _ => {}
        }

        self.prune().await?;
        self.maybe_compact().await?;
        Ok(())
    }

    /// Wait for queued writes and stop the log writer
    pub async fn close(self) -> HistoryResult<()> {
        self.store.close().await?;
        Ok(())
    }

    /// Drop the oldest non-favorites beyond the configured size
    async fn prune(&mut self) -> HistoryResult<()> {
        let excess = self
            .recent()
            .count()
            .saturating_sub(self.config.history_size);
        if excess == 0 {
            return Ok(());
        }

        let victims: Vec<EntryId> = self
            .entries
            .iter()
            .filter(|entry| !entry.favorite)
            .take(excess)
            .map(|entry| entry.id)
            .collect();

        let mut tickets = Vec::with_capacity(victims.len());
        for id in victims {
            let logged = self.is_logged(id);
            self.remove(id);
            if logged {
                tickets.push(self.store.delete_text_entry(id));
            }
        }
        self.commit(tickets).await?;

        debug!(pruned = excess, limit = self.config.history_size, "Pruned history");
        Ok(())
    }

    /// Log a memory-only entry under a fresh id, moving it to the end
    async fn log_entry(&mut self, id: EntryId) -> HistoryResult<EntryId> {
        let Some(entry) = self.entries.get(id) else {
            return Err(HistoryError::EntryNotFound(id));
        };
        let (text, favorite) = (entry.text.clone(), entry.favorite);
        let new_id = self.next_id;

        let mut tickets = vec![self.store.store_text_entry(&text)];
        if favorite {
            tickets.push(self.store.update_favorite_status(new_id, true));
        }
        self.commit(tickets).await?;

        self.next_id.take_next();
        self.unlogged.remove(&id);
        self.rekey(id, new_id);
        self.entries.move_to_back(new_id);
        trace!(from = %id, to = %new_id, "Logged memory-only entry");
        Ok(new_id)
    }

    /// Turn a logged entry into a memory-only one; its DELETE is the caller's
    fn unlog(&mut self, id: EntryId) {
        let new_id = self.allocate_unlogged();
        self.rekey(id, new_id);
    }

    async fn unlog_non_favorites(&mut self) -> HistoryResult<()> {
        let doomed: Vec<EntryId> = self
            .entries
            .iter()
            .filter(|entry| !entry.favorite && !self.unlogged.contains(&entry.id))
            .map(|entry| entry.id)
            .collect();
        if doomed.is_empty() {
            return Ok(());
        }

        let tickets = doomed
            .iter()
            .map(|&id| self.store.delete_text_entry(id))
            .collect();
        self.commit(tickets).await?;

        for &id in &doomed {
            self.unlog(id);
        }
        info!(entries = doomed.len(), "Removed non-favorites from the log");
        Ok(())
    }

    async fn log_unlogged_entries(&mut self) -> HistoryResult<()> {
        let pending: Vec<EntryId> = self
            .entries
            .ids()
            .filter(|id| self.unlogged.contains(id))
            .collect();
        for &id in &pending {
            self.log_entry(id).await?;
        }
        if !pending.is_empty() {
            info!(entries = pending.len(), "Logged memory-only entries");
        }
        Ok(())
    }

    fn allocate_unlogged(&mut self) -> EntryId {
        let id = self.next_unlogged;
        self.next_unlogged = EntryId::new(id.as_u32().saturating_sub(1));
        self.unlogged.insert(id);
        id
    }

    /// Give an entry a new id, keeping its place in the list
    fn rekey(&mut self, old: EntryId, new: EntryId) {
        let follower = self.entries.ids().skip_while(|&id| id != old).nth(1);
        let Some(mut entry) = self.entries.detach(old) else {
            return;
        };
        entry.id = new;
        if self.lookup.get(&entry.text) == Some(&old) {
            self.lookup.insert(entry.text.clone(), new);
        }
        if self.selected == Some(old) {
            self.selected = Some(new);
        }
        match follower {
            Some(anchor) => {
                if let Err(entry) = self.entries.insert_before(anchor, entry) {
                    self.entries.push_back(entry);
                }
            }
            None => {
                self.entries.push_back(entry);
            }
        }
    }

    async fn maybe_compact(&mut self) -> HistoryResult<()> {
        let (entries, unlogged) = (&self.entries, &self.unlogged);
        if let Some(pending) = self
            .store
            .maybe_perform_log_compaction(|| snapshot_order(entries, unlogged))
        {
            self.finish_rewrite(pending).await?;
        }
        Ok(())
    }

    /// Wait for appends; on failure rewrite the log from memory
    ///
    /// A failed append may leave a partial record that would hide every
    /// later one from replay, so the log is rebuilt before the error is
    /// returned. If the rewrite fails too the previous log stays in place.
    async fn commit(&mut self, tickets: Vec<WriteTicket>) -> HistoryResult<()> {
        if let Err(err) = wait_all(tickets).await {
            self.resync(&err).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn resync(&mut self, cause: &StorageError) {
        warn!(error = %cause, "Log write failed, rewriting the log from memory");
        let (entries, unlogged) = (&self.entries, &self.unlogged);
        let pending = self
            .store
            .reset_database(|| snapshot_order(entries, unlogged));
        if let Err(err) = self.finish_rewrite(pending).await {
            warn!(error = %err, "Rewrite failed, keeping the previous log");
        }
    }

    /// Wait for a rewrite and renumber the list to match it
    ///
    /// A failed rewrite leaves the old log in place, so the list keeps its
    /// old ids.
    async fn finish_rewrite(&mut self, pending: PendingCompaction) -> HistoryResult<()> {
        let result = pending.wait().await?;
        self.renumber(&result);
        Ok(())
    }

    fn renumber(&mut self, result: &CompactionResult) {
        let mut next_id = EntryId::FIRST;
        let mut entries = EntryList::new();
        let selected = self.selected.take();
        self.lookup.clear();

        for entry in snapshot_order(&self.entries, &self.unlogged) {
            let id = next_id.take_next();
            if selected == Some(entry.id) {
                self.selected = Some(id);
            }
            self.lookup.insert(entry.text.clone(), id);
            entries.push_back(Entry::new(id, entry.text).with_favorite(entry.favorite));
        }

        if next_id != result.next_id {
            warn!(
                memory = %next_id,
                log = %result.next_id,
                "Renumbered history disagrees with the rewritten log"
            );
        }

        // Memory-only entries keep their ids and follow the logged ones
        for entry in self.entries.iter().filter(|e| self.unlogged.contains(&e.id)) {
            if selected == Some(entry.id) {
                self.selected = Some(entry.id);
            }
            self.lookup.insert(entry.text.clone(), entry.id);
            entries.push_back(entry.clone());
        }

        self.entries = entries;
        self.next_id = next_id;
        debug!(entries = self.entries.len(), next_id = %self.next_id, "Renumbered history");
    }

    /// Detach an entry from the list and every index
    fn remove(&mut self, id: EntryId) -> Option<Entry> {
        let entry = self.entries.detach(id)?;
        self.unlogged.remove(&id);
        if self.lookup.get(&entry.text) == Some(&id) {
            self.lookup.remove(&entry.text);
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(entry)
    }
}

/// The order a rewritten log stores entries in
///
/// Memory-only entries are left out.
fn snapshot_order(entries: &EntryList, unlogged: &HashSet<EntryId>) -> Vec<Entry> {
    let (mut ordered, others): (Vec<Entry>, Vec<Entry>) = entries
        .iter()
        .filter(|entry| !unlogged.contains(&entry.id))
        .cloned()
        .partition(|entry| entry.favorite);
    ordered.extend(others);
    ordered
}

async fn wait_all(tickets: Vec<WriteTicket>) -> Result<(), StorageError> {
    for ticket in tickets {
        ticket.wait().await?;
    }
    Ok(())
}
