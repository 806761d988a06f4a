use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// User Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub day_start_hour: i32,
    pub overall_streak: i32,
    pub longest_overall_streak: i32,
    pub last_overall_streak_date: Option<String>,
    pub streak_shields: i32,
    pub last_shield_earned_at: i32,
    pub streak_shields_used: Vec<ShieldUse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Record of one consumed streak shield.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldUse {
    pub date: String,
    pub reason: String,
    pub overall_streak_at_time: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Overall streak + shield summary for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakSummary {
    pub overall_streak: i32,
    pub longest_overall_streak: i32,
    pub last_overall_streak_date: Option<String>,
    pub streak_shields: i32,
    pub streak_shields_used: Vec<ShieldUse>,
}

// ============================================================================
// Challenge Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetMode {
    Single,
    Multi,
}

impl BetMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetMode::Single => "single",
            BetMode::Multi => "multi",
        }
    }
}

impl FromStr for BetMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(BetMode::Single),
            "multi" => Ok(BetMode::Multi),
            _ => Err(()),
        }
    }
}

/// A staked file. For multi-mode challenges the milestone fields are set;
/// single-mode items carry `None` there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetItem {
    pub name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    /// Opaque payload as uploaded (base64). Cleared on failure.
    pub payload: String,
    pub uploaded_at: DateTime<Utc>,
    pub milestone_index: Option<i32>,
    pub unlock_day: Option<i32>,
    pub is_unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// One timer session inside a daily entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Per-day accumulated progress. `date` is a `YYYY-MM-DD` string and is the
/// join key between the ledger, the streak engine, and the failure logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyEntry {
    pub date: String,
    pub minutes_accumulated: i64,
    pub seconds_accumulated: i64,
    pub goal_reached: bool,
    pub sessions: Vec<SessionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeDayUse {
    pub date: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDate {
    pub date: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub duration_days: i32,
    pub daily_target_minutes: i64,
    pub scheduled_start_time: Option<String>,
    pub start_time_required: bool,
    pub bet_mode: BetMode,
    pub bet_items: Vec<BetItem>,
    pub total_bets: i32,
    pub safe_days_total: i32,
    pub safe_days_remaining: i32,
    pub safe_days_used: Vec<SafeDayUse>,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub completed_days: Vec<DailyEntry>,
    pub total_minutes: i64,
    pub is_active: bool,
    pub is_completed: bool,
    pub is_bet_locked: bool,
    pub is_bet_returned: bool,
    pub has_failed: bool,
    pub failed_dates: Vec<FailedDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_completed_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Challenge {
    pub fn day_entry(&self, date: &str) -> Option<&DailyEntry> {
        self.completed_days.iter().find(|d| d.date == date)
    }

    pub fn goal_reached_on(&self, date: &str) -> bool {
        self.day_entry(date).map(|d| d.goal_reached).unwrap_or(false)
    }

    pub fn lifeline_used_on(&self, date: &str) -> bool {
        self.safe_days_used.iter().any(|s| s.date == date)
    }

    /// A challenge still counts toward the user's daily obligations.
    pub fn is_settleable(&self) -> bool {
        self.is_active && !self.is_completed && !self.has_failed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBetItem {
    pub name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub payload: String,
    pub milestone_index: Option<i32>,
    pub unlock_day: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChallengeRequest {
    pub title: String,
    pub description: Option<String>,
    pub duration_days: i32,
    pub daily_target_minutes: i64,
    pub scheduled_start_time: Option<String>,
    pub start_time_required: Option<bool>,
    pub bet_mode: BetMode,
    pub bet_items: Vec<CreateBetItem>,
    pub total_bets: i32,
    pub safe_days_total: i32,
}

/// Challenge plus today's ledger snapshot, for dashboard rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeWithToday {
    pub challenge: Challenge,
    pub minutes_today: i64,
    pub goal_reached_today: bool,
}

// ============================================================================
// Time Entry Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub is_running: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTimeEntryRequest {
    pub challenge_id: Option<Uuid>,
}

// ============================================================================
// Session Stop / Settlement Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopSessionRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// A safe day was consumed to cover a missed day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeDayInfo {
    pub challenge_title: String,
    pub date_covered: String,
    pub safe_days_remaining: i32,
}

/// A challenge failed during this settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeFailureInfo {
    pub challenge_title: String,
    pub failed_date: String,
    pub reason: String,
    pub longest_streak: i32,
    pub shield_used: bool,
    pub shields_remaining: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockedBet {
    pub name: String,
    pub milestone_index: Option<i32>,
}

/// One or more staked files became accessible during this settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetUnlockInfo {
    pub challenge_title: String,
    pub unlocked_bets: Vec<UnlockedBet>,
    pub challenge_completed: bool,
    pub longest_streak: i32,
}

/// Everything a notification layer needs to describe the stop, without
/// re-querying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopSessionResponse {
    pub challenge: Challenge,
    pub minutes_logged_today: i64,
    pub goal_reached: bool,
    pub target_minutes: i64,
    pub safe_day_info: Option<SafeDayInfo>,
    pub failure_info: Option<ChallengeFailureInfo>,
    pub bet_unlock_info: Option<BetUnlockInfo>,
}

// ============================================================================
// Bet Download Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetDownload {
    pub name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub payload: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetDownloadResponse {
    pub challenge_title: String,
    pub items: Vec<BetDownload>,
}

/// Structured rejection for a bet download attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetAccessDenied {
    pub error: String,
    pub message: String,
    pub is_completed: bool,
    pub is_bet_locked: bool,
    pub has_failed: bool,
}

/// Structured rejection for a delete attempt outside the 24h window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteWindowClosed {
    pub error: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub hours_elapsed: i64,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge_with_days(days: Vec<DailyEntry>) -> Challenge {
        let now = Utc::now();
        Challenge {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Meditate".to_string(),
            description: "".to_string(),
            duration_days: 30,
            daily_target_minutes: 20,
            scheduled_start_time: None,
            start_time_required: false,
            bet_mode: BetMode::Single,
            bet_items: vec![],
            total_bets: 1,
            safe_days_total: 2,
            safe_days_remaining: 2,
            safe_days_used: vec![],
            current_streak: 0,
            longest_streak: 0,
            completed_days: days,
            total_minutes: 0,
            is_active: true,
            is_completed: false,
            is_bet_locked: true,
            is_bet_returned: false,
            has_failed: false,
            failed_dates: vec![],
            completed_at: None,
            last_completed_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_bet_mode_round_trip() {
        assert_eq!(BetMode::Single.as_str(), "single");
        assert_eq!(BetMode::Multi.as_str(), "multi");
        assert_eq!("single".parse(), Ok(BetMode::Single));
        assert_eq!("MULTI".parse(), Ok(BetMode::Multi));
        assert!("triple".parse::<BetMode>().is_err());
    }

    #[test]
    fn test_goal_reached_on() {
        let challenge = challenge_with_days(vec![DailyEntry {
            date: "2025-03-01".to_string(),
            minutes_accumulated: 25,
            seconds_accumulated: 0,
            goal_reached: true,
            sessions: vec![],
        }]);

        assert!(challenge.goal_reached_on("2025-03-01"));
        assert!(!challenge.goal_reached_on("2025-03-02"));
    }

    #[test]
    fn test_is_settleable() {
        let mut challenge = challenge_with_days(vec![]);
        assert!(challenge.is_settleable());

        challenge.has_failed = true;
        assert!(!challenge.is_settleable());

        challenge.has_failed = false;
        challenge.is_completed = true;
        assert!(!challenge.is_settleable());
    }

    #[test]
    fn test_api_success() {
        let success = ApiSuccess::new("test data");
        assert_eq!(success.data, "test data");
    }
}
