use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation and completion timestamps of an interaction, in epoch milliseconds.
///
/// Either side may be missing. Timestamps are passed through as recorded, so a
/// completion earlier than the creation yields a negative duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeSpan {
    #[serde(rename = "created", default)]
    pub created_at: Option<i64>,
    #[serde(rename = "completed", default)]
    pub completed_at: Option<i64>,
}

impl TimeSpan {
    pub fn new(created_at: Option<i64>, completed_at: Option<i64>) -> Self {
        Self {
            created_at,
            completed_at,
        }
    }

    /// `completed_at - created_at`, present only when both are
    #[inline]
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.created_at, self.completed_at) {
            (Some(created), Some(completed)) => Some(completed - created),
            _ => None,
        }
    }

    pub fn created_datetime(&self) -> Option<DateTime<Utc>> {
        self.created_at.and_then(DateTime::from_timestamp_millis)
    }

    pub fn completed_datetime(&self) -> Option<DateTime<Utc>> {
        self.completed_at.and_then(DateTime::from_timestamp_millis)
    }
}
