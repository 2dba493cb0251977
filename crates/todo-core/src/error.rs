//! Error types for todo-core

use thiserror::Error;

use crate::item::TodoId;

/// Result type alias for todo operations
pub type Result<T> = std::result::Result<T, TodoError>;

/// Main error type for todo operations
#[derive(Error, Debug)]
pub enum TodoError {
    /// A draft failed the validation gate
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The submit affordance is still cooling down
    #[error("Submit is cooling down for another {remaining_ms} ms")]
    CoolingDown { remaining_ms: u64 },

    /// A remote store call failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration is invalid or could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// No identity is signed in
    #[error("Not signed in")]
    Unauthenticated,

    /// The identity lacks the privilege for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

/// Reasons a draft cannot become a todo item.
///
/// The `Display` text is what the rendering surface shows next to the
/// submit button.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Enter a task description")]
    EmptyText,

    #[error("Choose a category")]
    EmptyCategory,

    #[error("Pick a deadline")]
    MissingDeadline,

    #[error("The deadline cannot be before today")]
    DeadlineInPast,

    #[error("Pick both a start and an end time")]
    MissingTimeRange,

    #[error("The start time must be before the end time")]
    InvertedTimeRange,
}

/// Errors from a remote store call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(TodoId),

    #[error("Store rejected the caller's identity")]
    Unauthorized,

    #[error("Store denied access: {0}")]
    Forbidden(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration validation error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),

    /// The document could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Serialization(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
