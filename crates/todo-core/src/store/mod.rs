//! Remote store adapter
//!
//! [`TodoStore`] is the seam between the session and whatever persists
//! items. Two backends ship with the crate:
//!
//! - [`InMemoryStore`]: process-local, shared by every caller holding it
//! - [`HttpStore`]: the per-item HTTP API served by `todo-server`

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::error::StoreError;
use crate::item::{NewTodo, TodoId, TodoItem};

/// Which owners' items a query returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Owner(String),
    All,
}

/// Ordering of query results. Ties fall back to creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    CreatedAt,
    OwnerName,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::CreatedAt => "created_at",
            SortOrder::OwnerName => "owner_name",
        }
    }
}

/// A query against the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoQuery {
    pub filter: Filter,
    #[serde(default)]
    pub order: SortOrder,
}

impl TodoQuery {
    /// One owner's items, oldest first
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self {
            filter: Filter::Owner(owner_id.into()),
            order: SortOrder::CreatedAt,
        }
    }

    /// Every item, grouped by owner name
    pub fn all_by_owner_name() -> Self {
        Self {
            filter: Filter::All,
            order: SortOrder::OwnerName,
        }
    }

    pub fn matches(&self, item: &TodoItem) -> bool {
        match &self.filter {
            Filter::Owner(owner) => item.owner_id == *owner,
            Filter::All => true,
        }
    }

    /// Sort items in place according to this query's order
    pub fn sort(&self, items: &mut [TodoItem]) {
        match self.order {
            SortOrder::CreatedAt => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::OwnerName => items.sort_by(|a, b| {
                a.owner_name
                    .cmp(&b.owner_name)
                    .then(a.created_at.cmp(&b.created_at))
            }),
        }
    }
}

/// Partial update of an item. Only completion can change after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_none()
    }

    pub fn apply(&self, item: &mut TodoItem) {
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
    }
}

/// The trait that all storage backends implement.
///
/// Calls are not retried or deduplicated here; callers decide what a
/// failure means for their own state.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Persist a new item and return it with its store-assigned id.
    async fn create(&self, todo: NewTodo) -> Result<TodoItem, StoreError>;

    /// Get an item by id.
    async fn get(&self, id: &TodoId) -> Result<Option<TodoItem>, StoreError>;

    /// Apply a partial update to an existing item.
    async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<(), StoreError>;

    /// Delete an item. Deleting a missing item succeeds.
    async fn delete(&self, id: &TodoId) -> Result<(), StoreError>;

    /// Items matching the query, in the query's order.
    async fn query(&self, query: &TodoQuery) -> Result<Vec<TodoItem>, StoreError>;

    /// Token that changes whenever one of `owner_id`'s items changes and
    /// not otherwise. Stores that cannot provide one return `None` and are
    /// reloaded unconditionally.
    async fn revision(&self, _owner_id: &str) -> Result<Option<u64>, StoreError> {
        Ok(None)
    }
}
