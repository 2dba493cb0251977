//! Todo item model
//!
//! Items are serialized camelCase so stored documents keep the field names
//! the web client has always used (`ownerId`, `createdAt`, `startTime`...).

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 86_400_000;
const LOCAL_ID_PREFIX: &str = "local-";

/// Opaque item identifier.
///
/// Store-assigned ids are whatever the store hands back; ids minted by the
/// client before a create resolves start with `local-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Local id derived from a millisecond timestamp
    pub fn local(millis: i64) -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{millis}"))
    }

    /// Whether this id was minted locally rather than by a store
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TodoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TodoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Task category. Preset labels map to their variant, anything else is a
/// free-text label entered through the "other" prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Category {
    Work,
    Study,
    Exercise,
    Other(String),
}

impl Category {
    /// Labels offered by the category selector
    pub const PRESETS: [&'static str; 3] = ["Work", "Study", "Exercise"];

    /// Map a selector label to a category. Returns `None` for a blank label.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        match label {
            "" => None,
            "Work" => Some(Category::Work),
            "Study" => Some(Category::Study),
            "Exercise" => Some(Category::Exercise),
            other => Some(Category::Other(other.to_string())),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Category::Work => "Work",
            Category::Study => "Study",
            Category::Exercise => "Exercise",
            Category::Other(label) => label,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.label().to_string()
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::from_label(&value).unwrap_or(Category::Other(value))
    }
}

/// The temporal constraint of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Schedule {
    /// Due at an absolute instant
    Deadline { deadline: DateTime<Utc> },
    /// Occupies a window within one day
    #[serde(rename_all = "camelCase")]
    TimeRange {
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
}

impl Schedule {
    /// Whole days left until the deadline, rounded up.
    ///
    /// Derived from the stored deadline at call time; `None` for time ranges.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        match self {
            Schedule::Deadline { deadline } => {
                let millis = (*deadline - now).num_milliseconds();
                let days = millis.div_euclid(MILLIS_PER_DAY);
                Some(if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
                    days + 1
                } else {
                    days
                })
            }
            Schedule::TimeRange { .. } => None,
        }
    }
}

/// Fields that passed the validation gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoFields {
    pub text: String,
    pub category: Category,
    pub schedule: Schedule,
}

/// A todo item that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub text: String,
    pub category: Category,
    pub schedule: Schedule,
    #[serde(default)]
    pub completed: bool,
    pub owner_id: String,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
}

impl NewTodo {
    pub fn from_fields(
        fields: TodoFields,
        owner_id: impl Into<String>,
        owner_name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            text: fields.text,
            category: fields.category,
            schedule: fields.schedule,
            completed: false,
            owner_id: owner_id.into(),
            owner_name: owner_name.into(),
            created_at,
        }
    }
}

/// A single task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
    pub category: Category,
    pub schedule: Schedule,
    pub owner_id: String,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
}

impl TodoItem {
    pub fn from_new(id: TodoId, new: NewTodo) -> Self {
        Self {
            id,
            text: new.text,
            completed: new.completed,
            category: new.category,
            schedule: new.schedule,
            owner_id: new.owner_id,
            owner_name: new.owner_name,
            created_at: new.created_at,
        }
    }

    /// The creation payload for this item, used when a create is re-issued
    pub fn to_new(&self) -> NewTodo {
        NewTodo {
            text: self.text.clone(),
            category: self.category.clone(),
            schedule: self.schedule.clone(),
            completed: self.completed,
            owner_id: self.owner_id.clone(),
            owner_name: self.owner_name.clone(),
            created_at: self.created_at,
        }
    }

    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.schedule.days_remaining(now)
    }
}
