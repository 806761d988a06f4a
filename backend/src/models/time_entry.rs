use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for timer sessions
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TimeEntryRow {
    pub id: String,
    pub user_id: String,
    pub challenge_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub is_running: bool,
    pub created_at: DateTime<Utc>,
}

impl TimeEntryRow {
    pub fn to_shared(&self) -> Result<shared::TimeEntry, crate::models::ModelError> {
        Ok(shared::TimeEntry {
            id: Uuid::parse_str(&self.id)?,
            user_id: Uuid::parse_str(&self.user_id)?,
            challenge_id: self
                .challenge_id
                .as_deref()
                .map(Uuid::parse_str)
                .transpose()?,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_seconds: self.duration_seconds,
            is_running: self.is_running,
            created_at: self.created_at,
        })
    }
}
