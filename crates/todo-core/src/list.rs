//! Client list state
//!
//! An ordered collection of items mirrored from the store and mutated
//! optimistically. Every entry carries a sync status so a write that the
//! store refused stays visible instead of silently diverging:
//!
//! ```text
//! add ──► Pending ──ok──► Confirmed ──toggle──► Pending ──ok──► Confirmed
//!            │                                     │
//!            └─err──► Failed(Create)               └─err──► Failed(Update)
//! ```
//!
//! Deleted items leave the list at once; until the store acknowledges the
//! delete a tombstone keeps reloads from bringing them back.

use std::collections::HashMap;

use serde::Serialize;

use crate::item::{NewTodo, TodoId, TodoItem};

/// Kind of remote write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOp {
    Create,
    Update,
    Delete,
}

/// Where an entry stands relative to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// The store holds this exact state
    Confirmed,
    /// A write is in flight
    Pending,
    /// The last write was refused or never arrived
    Failed(SyncOp),
}

impl SyncStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, SyncStatus::Confirmed)
    }
}

/// One item in the list with its sync bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub item: TodoItem,
    pub status: SyncStatus,
    /// Id the item had before the store assigned one
    local_id: Option<TodoId>,
    /// Whether the store has acknowledged creating this item
    stored: bool,
    /// Completion the store last acknowledged
    stored_completed: Option<bool>,
    revision: u64,
}

impl Entry {
    fn confirmed(item: TodoItem, revision: u64) -> Self {
        let stored_completed = Some(item.completed);
        Self {
            item,
            status: SyncStatus::Confirmed,
            local_id: None,
            stored: true,
            stored_completed,
            revision,
        }
    }

    pub fn id(&self) -> &TodoId {
        &self.item.id
    }

    pub fn is_stored(&self) -> bool {
        self.stored
    }

    fn answers_to(&self, id: &TodoId) -> bool {
        self.item.id == *id || self.local_id.as_ref() == Some(id)
    }
}

/// Result of a local toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggle {
    /// Current id of the toggled item
    pub id: TodoId,
    pub completed: bool,
    /// Entry revision the write belongs to
    pub revision: u64,
    /// Whether an update should be sent now. False while the create is
    /// still outstanding; the create's confirmation carries it instead.
    pub send: bool,
}

/// Result of a local delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub item: TodoItem,
    /// Store id to delete, if the store has the item
    pub stored_id: Option<TodoId>,
}

/// Result of applying a create acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The entry now carries its store id; `follow_up` is an update to
    /// send when the item was toggled while the create was in flight.
    Confirmed { follow_up: Option<Toggle> },
    /// The entry was deleted while the create was in flight; the stored
    /// copy with this id should be removed.
    Orphaned(TodoId),
}

/// A failed write re-armed for sending
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retry {
    Create { local_id: TodoId, todo: NewTodo },
    Update(Toggle),
    Delete(TodoId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tombstone {
    item: TodoItem,
    status: SyncStatus,
    /// False while the item's create is still in flight; `item.id` is then
    /// the local id
    stored: bool,
}

impl Tombstone {
    fn hides(&self, item: &TodoItem) -> bool {
        if self.stored {
            self.item.id == item.id
        } else {
            same_submission(&self.item, item)
        }
    }
}

/// Whether a stored item is the copy of a locally added one whose store id
/// is not known yet
fn same_submission(local: &TodoItem, stored: &TodoItem) -> bool {
    local.owner_id == stored.owner_id
        && local.created_at == stored.created_at
        && local.text == stored.text
}

/// Ordered, optimistic mirror of one owner's items.
#[derive(Debug, Clone, Default)]
pub struct TodoList {
    entries: Vec<Entry>,
    tombstones: Vec<Tombstone>,
    tracked: bool,
    last_local_id: i64,
    next_revision: u64,
}

impl TodoList {
    /// List whose mutations are mirrored to a store
    pub fn tracked() -> Self {
        Self {
            tracked: true,
            ..Self::default()
        }
    }

    /// List with no store behind it; every mutation is final at once
    pub fn local() -> Self {
        Self::default()
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &TodoItem> {
        self.entries.iter().map(|e| &e.item)
    }

    /// Look an entry up by its current id or the local id it started with
    pub fn get(&self, id: &TodoId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.answers_to(id))
    }

    /// Entries and tombstones whose last write failed
    pub fn failed(&self) -> Vec<(TodoId, SyncOp)> {
        let entries = self.entries.iter().filter_map(|e| match e.status {
            SyncStatus::Failed(op) => Some((e.item.id.clone(), op)),
            _ => None,
        });
        let tombstones = self.tombstones.iter().filter_map(|t| match t.status {
            SyncStatus::Failed(op) => Some((t.item.id.clone(), op)),
            _ => None,
        });
        entries.chain(tombstones).collect()
    }

    /// Number of writes still in flight
    pub fn pending_count(&self) -> usize {
        let entries = self
            .entries
            .iter()
            .filter(|e| e.status == SyncStatus::Pending)
            .count();
        let tombstones = self
            .tombstones
            .iter()
            .filter(|t| t.status == SyncStatus::Pending)
            .count();
        entries + tombstones
    }

    /// Drop everything, e.g. when the identity changes
    pub fn clear(&mut self) {
        self.entries.clear();
        self.tombstones.clear();
    }

    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    fn next_local_id(&mut self, now_millis: i64) -> TodoId {
        let millis = now_millis.max(self.last_local_id + 1);
        self.last_local_id = millis;
        TodoId::local(millis)
    }

    fn position(&self, id: &TodoId) -> Option<usize> {
        self.entries.iter().position(|e| e.answers_to(id))
    }

    /// Append a new item under a fresh local id.
    ///
    /// Local ids come from the millisecond clock but never repeat, even when
    /// several items are added within one millisecond.
    pub fn push(&mut self, todo: NewTodo, now_millis: i64) -> TodoId {
        let id = self.next_local_id(now_millis);
        let revision = self.bump();
        let status = if self.tracked {
            SyncStatus::Pending
        } else {
            SyncStatus::Confirmed
        };

        self.entries.push(Entry {
            item: TodoItem::from_new(id.clone(), todo),
            status,
            local_id: None,
            stored: false,
            stored_completed: None,
            revision,
        });
        id
    }

    /// Flip completion of the matching item. Unknown ids are a no-op.
    pub fn toggle(&mut self, id: &TodoId) -> Option<Toggle> {
        let index = self.position(id)?;
        let revision = self.bump();
        let tracked = self.tracked;
        let entry = &mut self.entries[index];

        entry.item.completed = !entry.item.completed;
        entry.revision = revision;

        let send = tracked && entry.stored;
        if send {
            entry.status = SyncStatus::Pending;
        }

        Some(Toggle {
            id: entry.item.id.clone(),
            completed: entry.item.completed,
            revision,
            send,
        })
    }

    /// Remove the matching item, keeping the order of the rest.
    pub fn remove(&mut self, id: &TodoId) -> Option<Removal> {
        let index = self.position(id)?;
        let entry = self.entries.remove(index);

        let stored_id = (self.tracked && entry.stored).then(|| entry.item.id.clone());
        let creating = self.tracked && !entry.stored && entry.status == SyncStatus::Pending;
        if stored_id.is_some() || creating {
            self.tombstones.push(Tombstone {
                item: entry.item.clone(),
                status: SyncStatus::Pending,
                stored: !creating,
            });
        }

        Some(Removal {
            item: entry.item,
            stored_id,
        })
    }

    /// Apply the store's answer to a create.
    pub fn confirm_created(&mut self, local_id: &TodoId, stored: &TodoItem) -> CreateOutcome {
        let Some(mut index) = self.position(local_id) else {
            if let Some(tombstone) = self
                .tombstones
                .iter_mut()
                .find(|t| !t.stored && t.item.id == *local_id)
            {
                tombstone.item.id = stored.id.clone();
                tombstone.stored = true;
            }
            return CreateOutcome::Orphaned(stored.id.clone());
        };

        // a reload may already have listed the stored copy
        if let Some(copy) = self
            .entries
            .iter()
            .position(|e| e.item.id == stored.id && !e.answers_to(local_id))
        {
            self.entries.remove(copy);
            if copy < index {
                index -= 1;
            }
        }

        let revision = self.bump();
        let entry = &mut self.entries[index];
        entry.local_id = Some(local_id.clone());
        entry.item.id = stored.id.clone();
        entry.stored = true;
        entry.stored_completed = Some(stored.completed);

        if entry.item.completed == stored.completed {
            entry.status = SyncStatus::Confirmed;
            return CreateOutcome::Confirmed { follow_up: None };
        }

        entry.status = SyncStatus::Pending;
        entry.revision = revision;
        CreateOutcome::Confirmed {
            follow_up: Some(Toggle {
                id: stored.id.clone(),
                completed: entry.item.completed,
                revision,
                send: true,
            }),
        }
    }

    pub fn fail_create(&mut self, local_id: &TodoId) {
        if let Some(index) = self.position(local_id) {
            let entry = &mut self.entries[index];
            if !entry.stored {
                entry.status = SyncStatus::Failed(SyncOp::Create);
            }
            return;
        }
        // deleted while creating; nothing reached the store
        self.tombstones.retain(|t| t.stored || t.item.id != *local_id);
    }

    /// Mark an update as acknowledged, unless a newer edit superseded it
    pub fn confirm_update(&mut self, id: &TodoId, revision: u64) {
        if let Some(index) = self.position(id) {
            let entry = &mut self.entries[index];
            if entry.revision == revision {
                entry.status = SyncStatus::Confirmed;
                entry.stored_completed = Some(entry.item.completed);
            }
        }
    }

    pub fn fail_update(&mut self, id: &TodoId, revision: u64) {
        if let Some(index) = self.position(id) {
            let entry = &mut self.entries[index];
            if entry.revision == revision {
                entry.status = SyncStatus::Failed(SyncOp::Update);
            }
        }
    }

    pub fn confirm_delete(&mut self, id: &TodoId) {
        self.tombstones.retain(|t| t.item.id != *id);
    }

    pub fn fail_delete(&mut self, id: &TodoId) {
        if let Some(tombstone) = self.tombstones.iter_mut().find(|t| t.item.id == *id) {
            tombstone.status = SyncStatus::Failed(SyncOp::Delete);
        }
    }

    /// Re-arm every failed write as pending and return what to send.
    pub fn begin_retry(&mut self) -> Vec<Retry> {
        let mut retries = Vec::new();

        for index in 0..self.entries.len() {
            let SyncStatus::Failed(op) = self.entries[index].status else {
                continue;
            };
            let revision = self.bump();
            let entry = &mut self.entries[index];
            entry.status = SyncStatus::Pending;
            entry.revision = revision;

            match op {
                SyncOp::Create => retries.push(Retry::Create {
                    local_id: entry.item.id.clone(),
                    todo: entry.item.to_new(),
                }),
                SyncOp::Update | SyncOp::Delete => retries.push(Retry::Update(Toggle {
                    id: entry.item.id.clone(),
                    completed: entry.item.completed,
                    revision,
                    send: true,
                })),
            }
        }

        for tombstone in &mut self.tombstones {
            if let SyncStatus::Failed(_) = tombstone.status {
                tombstone.status = SyncStatus::Pending;
                retries.push(Retry::Delete(tombstone.item.id.clone()));
            }
        }

        retries
    }

    /// Undo the local effect of a failed write.
    ///
    /// A failed create disappears, a failed toggle reverts to the stored
    /// completion, a failed delete puts the item back. Returns whether
    /// anything changed.
    pub fn rollback(&mut self, id: &TodoId) -> bool {
        if let Some(index) = self.position(id) {
            let status = self.entries[index].status;
            match status {
                SyncStatus::Failed(SyncOp::Create) => {
                    self.entries.remove(index);
                    return true;
                }
                SyncStatus::Failed(_) => {
                    let revision = self.bump();
                    let entry = &mut self.entries[index];
                    if let Some(completed) = entry.stored_completed {
                        entry.item.completed = completed;
                    }
                    entry.status = SyncStatus::Confirmed;
                    entry.revision = revision;
                    return true;
                }
                _ => return false,
            }
        }

        let Some(index) = self
            .tombstones
            .iter()
            .position(|t| t.item.id == *id && t.status == SyncStatus::Failed(SyncOp::Delete))
        else {
            return false;
        };

        let tombstone = self.tombstones.remove(index);
        let revision = self.bump();
        let at = self
            .entries
            .iter()
            .position(|e| e.stored && e.item.created_at > tombstone.item.created_at)
            .unwrap_or(self.entries.len());
        self.entries
            .insert(at, Entry::confirmed(tombstone.item, revision));
        true
    }

    /// Merge a full listing from the store into the list.
    ///
    /// Store items replace their local copies unless the local copy has a
    /// write in flight or failed; tombstoned items stay hidden; items the
    /// store has never seen stay at the end in their current order. A store
    /// item that is the copy of a create still in flight is left to the
    /// create's answer; one whose create was reported failed is adopted.
    /// With nothing outstanding this is a plain replacement.
    pub fn reload(&mut self, stored: Vec<TodoItem>) {
        let mut unstored = Vec::new();
        let mut previous: HashMap<TodoId, Entry> = HashMap::new();
        for entry in self.entries.drain(..) {
            if entry.stored {
                previous.insert(entry.item.id.clone(), entry);
            } else {
                unstored.push(entry);
            }
        }

        let mut merged = Vec::with_capacity(stored.len() + unstored.len());
        for item in stored {
            if self.tombstones.iter().any(|t| t.hides(&item)) {
                continue;
            }

            if let Some(at) = unstored
                .iter()
                .position(|e| same_submission(&e.item, &item))
            {
                if unstored[at].status == SyncStatus::Pending {
                    continue;
                }
                let local = unstored.remove(at);
                self.next_revision += 1;
                let mut entry = Entry::confirmed(item, self.next_revision);
                entry.local_id = Some(local.item.id);
                merged.push(entry);
                continue;
            }

            let entry = match previous.remove(&item.id) {
                Some(local) if !local.status.is_settled() => local,
                Some(local) => {
                    let mut entry = Entry::confirmed(item, local.revision);
                    entry.local_id = local.local_id;
                    entry
                }
                None => {
                    self.next_revision += 1;
                    Entry::confirmed(item, self.next_revision)
                }
            };
            merged.push(entry);
        }

        merged.extend(unstored);
        self.entries = merged;
    }
}
