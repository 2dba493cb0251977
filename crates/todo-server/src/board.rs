//! Whole-list fallback boards
//!
//! Each session key owns one board: an opaque list that clients read and
//! replace wholesale. Boards live in memory only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Board {
    todo: Vec<Value>,
    last_updated: DateTime<Utc>,
}

/// Boards keyed by session
#[derive(Debug)]
pub struct Boards {
    boards: RwLock<HashMap<String, Board>>,
    started: DateTime<Utc>,
}

impl Default for Boards {
    fn default() -> Self {
        Self::new()
    }
}

impl Boards {
    pub fn new() -> Self {
        Self {
            boards: RwLock::new(HashMap::new()),
            started: Utc::now(),
        }
    }

    /// The board's list; empty for a session that never wrote one
    pub async fn get(&self, key: &str) -> Vec<Value> {
        self.boards
            .read()
            .await
            .get(key)
            .map(|b| b.todo.clone())
            .unwrap_or_default()
    }

    /// Replace the board's list and return the new change marker
    pub async fn replace(&self, key: &str, todo: Vec<Value>) -> DateTime<Utc> {
        let mut boards = self.boards.write().await;
        let previous = boards
            .get(key)
            .map(|b| b.last_updated)
            .unwrap_or(self.started);
        // strictly increasing per board, starting after server start
        let now = Utc::now().max(previous + chrono::Duration::milliseconds(1));
        boards.insert(
            key.to_string(),
            Board {
                todo,
                last_updated: now,
            },
        );
        now
    }

    /// When the board last changed; server start time if it never did
    pub async fn last_updated(&self, key: &str) -> DateTime<Utc> {
        self.boards
            .read()
            .await
            .get(key)
            .map(|b| b.last_updated)
            .unwrap_or(self.started)
    }

    pub async fn len(&self) -> usize {
        self.boards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
