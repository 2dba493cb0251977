//! Validation gate for the add intent
//!
//! Staged input lives in a [`Draft`]. The [`SubmitGate`] decides whether a
//! draft may become a todo item and debounces the submit affordance: after
//! every submission, accepted or not, the affordance stays disabled for the
//! configured cool-down.

use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveTime, Utc};
use thiserror::Error;

use crate::error::{TodoError, ValidationError};
use crate::item::{Category, Schedule, TodoFields};

/// Schedule fields as staged by the input widgets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftSchedule {
    Deadline(Option<DateTime<Utc>>),
    TimeRange {
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    },
}

impl Default for DraftSchedule {
    fn default() -> Self {
        DraftSchedule::TimeRange {
            start: None,
            end: None,
        }
    }
}

impl DraftSchedule {
    fn cleared(&self) -> Self {
        match self {
            DraftSchedule::Deadline(_) => DraftSchedule::Deadline(None),
            DraftSchedule::TimeRange { .. } => DraftSchedule::default(),
        }
    }
}

/// Transient input state for a task that has not been submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    /// Selector label, or the free text entered after choosing "other"
    pub category: String,
    pub schedule: DraftSchedule,
}

impl Draft {
    /// Draft for the time-range variant. Clock strings that do not parse as
    /// `HH:MM` (or `HH:MM:SS`) are staged as missing.
    pub fn time_range(text: &str, category: &str, start: &str, end: &str) -> Self {
        Self {
            text: text.to_string(),
            category: category.to_string(),
            schedule: DraftSchedule::TimeRange {
                start: parse_clock(start),
                end: parse_clock(end),
            },
        }
    }

    /// Draft for the deadline variant
    pub fn deadline(text: &str, category: &str, deadline: DateTime<Utc>) -> Self {
        Self {
            text: text.to_string(),
            category: category.to_string(),
            schedule: DraftSchedule::Deadline(Some(deadline)),
        }
    }

    /// Reset every field, keeping the schedule variant
    pub fn clear(&mut self) {
        self.text.clear();
        self.category.clear();
        self.schedule = self.schedule.cleared();
    }

    /// Check the draft against the creation rules.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<TodoFields, ValidationError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }

        let schedule = match &self.schedule {
            DraftSchedule::Deadline(None) => return Err(ValidationError::MissingDeadline),
            DraftSchedule::Deadline(Some(deadline)) => {
                if deadline.date_naive() < now.date_naive() {
                    return Err(ValidationError::DeadlineInPast);
                }
                Schedule::Deadline {
                    deadline: *deadline,
                }
            }
            DraftSchedule::TimeRange {
                start: Some(start),
                end: Some(end),
            } => {
                if start >= end {
                    return Err(ValidationError::InvertedTimeRange);
                }
                Schedule::TimeRange {
                    start_time: *start,
                    end_time: *end,
                }
            }
            DraftSchedule::TimeRange { .. } => return Err(ValidationError::MissingTimeRange),
        };

        let category = Category::from_label(&self.category).ok_or(ValidationError::EmptyCategory)?;

        Ok(TodoFields {
            text: text.to_string(),
            category,
            schedule,
        })
    }
}

/// Parse a clock time as typed into a time input
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Why a submission was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Submit is cooling down for another {remaining:?}")]
    CoolingDown { remaining: Duration },
}

impl From<GateError> for TodoError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Invalid(e) => TodoError::Validation(e),
            GateError::CoolingDown { remaining } => TodoError::CoolingDown {
                remaining_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
            },
        }
    }
}

/// Decides whether a pending add may proceed and debounces the submit button.
#[derive(Debug, Clone)]
pub struct SubmitGate {
    cooldown: Duration,
    disabled_until: Option<Instant>,
    message: Option<String>,
}

impl SubmitGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            disabled_until: None,
            message: None,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether the submit affordance is enabled right now
    pub fn is_enabled(&self) -> bool {
        self.is_enabled_at(Instant::now())
    }

    pub fn is_enabled_at(&self, now: Instant) -> bool {
        self.disabled_until.map_or(true, |until| now >= until)
    }

    /// The inline error message from the last rejected submission
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn submit(&mut self, draft: &mut Draft) -> Result<TodoFields, GateError> {
        self.submit_at(draft, Instant::now(), Utc::now())
    }

    /// Submit a draft at the given instants.
    ///
    /// On success the draft is cleared and the message reset; on a
    /// validation failure the draft is kept and the message set. Both start
    /// the cool-down. A submission during the cool-down changes nothing.
    pub fn submit_at(
        &mut self,
        draft: &mut Draft,
        now: Instant,
        wall_clock: DateTime<Utc>,
    ) -> Result<TodoFields, GateError> {
        if let Some(until) = self.disabled_until {
            if now < until {
                return Err(GateError::CoolingDown {
                    remaining: until - now,
                });
            }
        }

        self.disabled_until = Some(now + self.cooldown);

        match draft.validate(wall_clock) {
            Ok(fields) => {
                self.message = None;
                draft.clear();
                Ok(fields)
            }
            Err(err) => {
                tracing::debug!("draft rejected: {}", err);
                self.message = Some(err.to_string());
                Err(err.into())
            }
        }
    }
}

impl Default for SubmitGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}
