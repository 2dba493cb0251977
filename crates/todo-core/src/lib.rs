//! Todo Core - Per-user task lists with optimistic store synchronization
//!
//! This crate provides the client-side model and state for a multi-user todo
//! list:
//!
//! - **Item**: Task records with a deadline or a same-day time window, and a category
//! - **Validation**: Draft checking and the submit gate with its cooldown
//! - **List**: Ordered, optimistic list state with per-item sync status
//! - **Store**: The `TodoStore` trait with in-memory and HTTP backends
//! - **Session**: Intent handlers that mutate the list and spawn store writes
//! - **Sync**: Background reloads on identity change or on a polling interval
//! - **Identity**: Signed-in user, role claims and the identity watch
//! - **Admin**: Read-only listing of every owner's items for administrators
//! - **Config**: Cooldown, sync mode, store location and server address
//!
//! # Architecture
//!
//! Intents apply locally first and never wait on the store. Each write is
//! sent on a spawned task; its answer either confirms the entry or marks it
//! failed so the user can retry or roll back.
//!
//! ```text
//! Draft → SubmitGate → TodoList (Pending) → TodoStore → TodoList (Confirmed | Failed)
//! ```

pub mod admin;
pub mod config;
pub mod error;
pub mod identity;
pub mod item;
pub mod list;
pub mod policy;
pub mod session;
pub mod store;
pub mod sync;
pub mod validation;

pub use admin::AdminView;
pub use config::{ServerConfig, StoreConfig, SubmitConfig, SyncConfig, SyncMode, TodoConfig};
pub use error::{ConfigError, Result, StoreError, TodoError, ValidationError};
pub use identity::{Identity, IdentityWatch, Role};
pub use item::{Category, NewTodo, Schedule, TodoFields, TodoId, TodoItem};
pub use list::{Entry, SyncOp, SyncStatus, TodoList};
pub use session::{PendingWrite, Submitted, TodoSession};
pub use store::{Filter, HttpStore, InMemoryStore, SortOrder, TodoPatch, TodoQuery, TodoStore};
pub use sync::{SyncStrategy, SyncTask};
pub use validation::{Draft, DraftSchedule, GateError, SubmitGate};
