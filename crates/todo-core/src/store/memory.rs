use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, TodoPatch, TodoQuery, TodoStore};
use crate::item::{NewTodo, TodoId, TodoItem};

/// Process-local implementation of the TodoStore trait.
///
/// Every clone of the `Arc` holding it sees the same documents; concurrent
/// writers are not serialized beyond the lock, so the last write wins.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    items: HashMap<TodoId, TodoItem>,
    revision: u64,
    /// Revision of each owner's last change
    owner_revisions: HashMap<String, u64>,
}

impl Inner {
    fn bump(&mut self, owner_id: &str) {
        self.revision += 1;
        self.owner_revisions.insert(owner_id.to_string(), self.revision);
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items
    pub async fn len(&self) -> usize {
        self.inner.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Revision of the last change by anyone
    pub async fn latest_revision(&self) -> u64 {
        self.inner.read().await.revision
    }
}

#[async_trait]
impl TodoStore for InMemoryStore {
    async fn create(&self, todo: NewTodo) -> Result<TodoItem, StoreError> {
        let id = TodoId::from(Uuid::new_v4().to_string());
        let item = TodoItem::from_new(id.clone(), todo);

        let mut inner = self.inner.write().await;
        inner.items.insert(id, item.clone());
        inner.bump(&item.owner_id);
        Ok(item)
    }

    async fn get(&self, id: &TodoId) -> Result<Option<TodoItem>, StoreError> {
        Ok(self.inner.read().await.items.get(id).cloned())
    }

    async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let item = inner
            .items
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply(item);
        let owner_id = item.owner_id.clone();
        inner.bump(&owner_id);
        Ok(())
    }

    async fn delete(&self, id: &TodoId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(item) = inner.items.remove(id) {
            inner.bump(&item.owner_id);
        }
        Ok(())
    }

    async fn query(&self, query: &TodoQuery) -> Result<Vec<TodoItem>, StoreError> {
        let inner = self.inner.read().await;
        let mut items: Vec<TodoItem> = inner
            .items
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();
        query.sort(&mut items);
        Ok(items)
    }

    async fn revision(&self, owner_id: &str) -> Result<Option<u64>, StoreError> {
        let inner = self.inner.read().await;
        Ok(Some(inner.owner_revisions.get(owner_id).copied().unwrap_or_default()))
    }
}
