use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use shared::BetMode;

/// Database model for challenges. The nested collections (bet items, daily
/// ledger, safe-day and failure logs) are stored as JSON so the whole
/// challenge is one aggregate row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChallengeRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub duration_days: i32,
    pub daily_target_minutes: i64,
    pub scheduled_start_time: Option<String>,
    pub start_time_required: bool,
    pub bet_mode: String,
    /// JSON array of `BetItem`
    pub bet_items: String,
    pub total_bets: i32,
    pub safe_days_total: i32,
    pub safe_days_remaining: i32,
    /// JSON array of `SafeDayUse`
    pub safe_days_used: String,
    pub current_streak: i32,
    pub longest_streak: i32,
    /// JSON array of `DailyEntry`, ordered by date
    pub completed_days: String,
    pub total_minutes: i64,
    pub is_active: bool,
    pub is_completed: bool,
    pub is_bet_locked: bool,
    pub is_bet_returned: bool,
    pub has_failed: bool,
    /// JSON array of `FailedDate`
    pub failed_dates: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_completed_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChallengeRow {
    /// Decode the aggregate. Any corrupt column is an error; an empty ledger
    /// read from a damaged row would look like a run of missed days to the
    /// streak engine.
    pub fn to_shared(&self) -> Result<shared::Challenge, crate::models::ModelError> {
        let bet_mode: BetMode = self
            .bet_mode
            .parse()
            .map_err(|_| crate::models::ModelError::UnknownBetMode(self.bet_mode.clone()))?;

        Ok(shared::Challenge {
            id: Uuid::parse_str(&self.id)?,
            user_id: Uuid::parse_str(&self.user_id)?,
            title: self.title.clone(),
            description: self.description.clone(),
            duration_days: self.duration_days,
            daily_target_minutes: self.daily_target_minutes,
            scheduled_start_time: self.scheduled_start_time.clone(),
            start_time_required: self.start_time_required,
            bet_mode,
            bet_items: serde_json::from_str(&self.bet_items)?,
            total_bets: self.total_bets,
            safe_days_total: self.safe_days_total,
            safe_days_remaining: self.safe_days_remaining,
            safe_days_used: serde_json::from_str(&self.safe_days_used)?,
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            completed_days: serde_json::from_str(&self.completed_days)?,
            total_minutes: self.total_minutes,
            is_active: self.is_active,
            is_completed: self.is_completed,
            is_bet_locked: self.is_bet_locked,
            is_bet_returned: self.is_bet_returned,
            has_failed: self.has_failed,
            failed_dates: serde_json::from_str(&self.failed_dates)?,
            completed_at: self.completed_at,
            last_completed_date: self.last_completed_date.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
