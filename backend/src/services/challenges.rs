use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ChallengeRow;
use shared::{
    BetDownload, BetDownloadResponse, BetItem, BetMode, Challenge, ChallengeWithToday,
    CreateChallengeRequest,
};

pub const DELETE_WINDOW_HOURS: i64 = 24;
pub const MAX_SAFE_DAYS: i32 = 5;
pub const MAX_MULTI_BETS: i32 = 5;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("Challenge not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Challenge can only be deleted within {DELETE_WINDOW_HOURS} hours of creation")]
    DeleteWindowClosed {
        created_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
        hours_elapsed: i64,
    },
    #[error("Bet is not accessible")]
    BetLocked {
        is_completed: bool,
        is_bet_locked: bool,
        has_failed: bool,
    },
    #[error("Corrupt stored record: {0}")]
    CorruptRecord(#[from] crate::models::ModelError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub async fn create_challenge(
    pool: &SqlitePool,
    user_id: &Uuid,
    request: &CreateChallengeRequest,
    now: DateTime<Utc>,
) -> Result<Challenge, ChallengeError> {
    validate_create(request)?;

    let id = Uuid::new_v4();

    let bet_items: Vec<BetItem> = request
        .bet_items
        .iter()
        .map(|item| BetItem {
            name: item.name.clone(),
            size_bytes: item.size_bytes,
            mime_type: item.mime_type.clone(),
            payload: item.payload.clone(),
            uploaded_at: now,
            milestone_index: item.milestone_index,
            unlock_day: item.unlock_day,
            is_unlocked: false,
            unlocked_at: None,
        })
        .collect();

    sqlx::query(
        r#"
        INSERT INTO challenges (
            id, user_id, title, description, duration_days, daily_target_minutes,
            scheduled_start_time, start_time_required, bet_mode, bet_items, total_bets,
            safe_days_total, safe_days_remaining, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(&request.title)
    .bind(request.description.as_deref().unwrap_or(""))
    .bind(request.duration_days)
    .bind(request.daily_target_minutes)
    .bind(&request.scheduled_start_time)
    .bind(request.start_time_required.unwrap_or(false))
    .bind(request.bet_mode.as_str())
    .bind(serde_json::to_string(&bet_items).unwrap_or_default())
    .bind(request.total_bets)
    .bind(request.safe_days_total)
    .bind(request.safe_days_total)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Challenge {
        id,
        user_id: *user_id,
        title: request.title.clone(),
        description: request.description.clone().unwrap_or_default(),
        duration_days: request.duration_days,
        daily_target_minutes: request.daily_target_minutes,
        scheduled_start_time: request.scheduled_start_time.clone(),
        start_time_required: request.start_time_required.unwrap_or(false),
        bet_mode: request.bet_mode,
        bet_items,
        total_bets: request.total_bets,
        safe_days_total: request.safe_days_total,
        safe_days_remaining: request.safe_days_total,
        safe_days_used: vec![],
        current_streak: 0,
        longest_streak: 0,
        completed_days: vec![],
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
    })
}

fn validate_create(request: &CreateChallengeRequest) -> Result<(), ChallengeError> {
    if request.duration_days < 1 {
        return Err(ChallengeError::Validation(
            "Duration must be at least one day".to_string(),
        ));
    }
    if request.daily_target_minutes < 1 {
        return Err(ChallengeError::Validation(
            "Daily target must be at least one minute".to_string(),
        ));
    }
    if request.safe_days_total < 0 || request.safe_days_total > MAX_SAFE_DAYS {
        return Err(ChallengeError::Validation(format!(
            "Safe days must be between 0 and {}",
            MAX_SAFE_DAYS
        )));
    }

    match request.bet_mode {
        BetMode::Single => {
            if request.total_bets != 1 || request.bet_items.len() != 1 {
                return Err(ChallengeError::Validation(
                    "Single bet mode requires exactly one bet".to_string(),
                ));
            }
        }
        BetMode::Multi => {
            if request.total_bets < 2 || request.total_bets > MAX_MULTI_BETS {
                return Err(ChallengeError::Validation(format!(
                    "Multi bet mode requires between 2 and {} bets",
                    MAX_MULTI_BETS
                )));
            }
            if request.bet_items.len() as i32 != request.total_bets {
                return Err(ChallengeError::Validation(
                    "Bet item count must match the declared total".to_string(),
                ));
            }
            if request
                .bet_items
                .iter()
                .any(|i| i.milestone_index.is_none() || i.unlock_day.is_none())
            {
                return Err(ChallengeError::Validation(
                    "Every multi bet item needs a milestone index and an unlock day".to_string(),
                ));
            }
        }
    }

    Ok(())
}

pub async fn get_challenge(
    pool: &SqlitePool,
    user_id: &Uuid,
    challenge_id: &Uuid,
) -> Result<Option<Challenge>, ChallengeError> {
    let row: Option<ChallengeRow> =
        sqlx::query_as("SELECT * FROM challenges WHERE id = ? AND user_id = ?")
            .bind(challenge_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|c| c.to_shared()).transpose()?)
}

/// List the user's challenges with today's ledger snapshot. Also runs the
/// opportunistic deactivation pass: a challenge completed on a prior day is
/// done displaying as "active" and goes inert on this read.
pub async fn list_challenges(
    pool: &SqlitePool,
    user_id: &Uuid,
    today: &str,
) -> Result<Vec<ChallengeWithToday>, ChallengeError> {
    deactivate_stale_completed(pool, user_id, today).await?;

    let rows: Vec<ChallengeRow> = sqlx::query_as(
        "SELECT * FROM challenges WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            let challenge = r.to_shared()?;
            let (minutes_today, goal_reached_today) = challenge
                .day_entry(today)
                .map(|d| (d.minutes_accumulated, d.goal_reached))
                .unwrap_or((0, false));
            Ok(ChallengeWithToday {
                challenge,
                minutes_today,
                goal_reached_today,
            })
        })
        .collect()
}

async fn deactivate_stale_completed(
    pool: &SqlitePool,
    user_id: &Uuid,
    today: &str,
) -> Result<(), ChallengeError> {
    sqlx::query(
        r#"
        UPDATE challenges SET is_active = 0
        WHERE user_id = ? AND is_completed = 1 AND is_active = 1
          AND last_completed_date IS NOT NULL AND last_completed_date < ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(today)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a challenge. Allowed only within 24 hours of creation; afterwards
/// the stake is committed and the challenge can only complete or fail.
pub async fn delete_challenge(
    pool: &SqlitePool,
    user_id: &Uuid,
    challenge_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<(), ChallengeError> {
    let challenge = get_challenge(pool, user_id, challenge_id)
        .await?
        .ok_or(ChallengeError::NotFound)?;

    let deadline = challenge.created_at + Duration::hours(DELETE_WINDOW_HOURS);
    if now > deadline {
        return Err(ChallengeError::DeleteWindowClosed {
            created_at: challenge.created_at,
            deadline,
            hours_elapsed: (now - challenge.created_at).num_hours(),
        });
    }

    sqlx::query("DELETE FROM time_entries WHERE challenge_id = ?")
        .bind(challenge_id.to_string())
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM challenges WHERE id = ?")
        .bind(challenge_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Hand back the staked files. Only a completed, unlocked challenge qualifies;
/// anything else gets the structured denial the client renders from.
pub async fn download_bet(
    pool: &SqlitePool,
    user_id: &Uuid,
    challenge_id: &Uuid,
) -> Result<BetDownloadResponse, ChallengeError> {
    let challenge = get_challenge(pool, user_id, challenge_id)
        .await?
        .ok_or(ChallengeError::NotFound)?;

    if !challenge.is_completed || challenge.is_bet_locked {
        return Err(ChallengeError::BetLocked {
            is_completed: challenge.is_completed,
            is_bet_locked: challenge.is_bet_locked,
            has_failed: challenge.has_failed,
        });
    }

    Ok(BetDownloadResponse {
        challenge_title: challenge.title.clone(),
        items: challenge
            .bet_items
            .iter()
            .map(|i| BetDownload {
                name: i.name.clone(),
                size_bytes: i.size_bytes,
                mime_type: i.mime_type.clone(),
                payload: i.payload.clone(),
                uploaded_at: i.uploaded_at,
            })
            .collect(),
    })
}
