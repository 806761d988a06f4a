use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::TimeEntryRow;
use crate::services::settlement::{self, SettlementError};
use shared::{StopSessionResponse, TimeEntry};

#[derive(Debug, Error)]
pub enum TimeEntryError {
    #[error("Time entry not found")]
    NotFound,
    #[error("Time entry is not running")]
    NotRunning,
    #[error("Settlement error: {0}")]
    SettlementError(#[from] SettlementError),
    #[error("Corrupt stored record: {0}")]
    CorruptRecord(#[from] crate::models::ModelError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Start a timer. Any other running entry for the user is stopped first;
/// a user has at most one live timer.
pub async fn start_entry(
    pool: &SqlitePool,
    user_id: &Uuid,
    challenge_id: Option<&Uuid>,
    now: DateTime<Utc>,
) -> Result<TimeEntry, TimeEntryError> {
    stop_all_running(pool, user_id, now).await?;

    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO time_entries (id, user_id, challenge_id, start_time, duration_seconds, is_running, created_at)
        VALUES (?, ?, ?, ?, 0, 1, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(challenge_id.map(|c| c.to_string()))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(TimeEntry {
        id,
        user_id: *user_id,
        challenge_id: challenge_id.copied(),
        start_time: now,
        end_time: None,
        duration_seconds: 0,
        is_running: true,
        created_at: now,
    })
}

async fn stop_all_running(
    pool: &SqlitePool,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<(), TimeEntryError> {
    // Abandoned timers are closed without settlement; only an explicit stop
    // counts toward a challenge.
    sqlx::query(
        r#"
        UPDATE time_entries
        SET is_running = 0,
            end_time = ?,
            duration_seconds = CAST((julianday(?) - julianday(start_time)) * 86400 AS INTEGER)
        WHERE user_id = ? AND is_running = 1
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Stop a running timer. The duration is recomputed from the stored start
/// time, never taken from the client. When the entry is attached to a
/// challenge, the stop settles through the same engine as the
/// challenge-scoped path.
pub async fn stop_entry(
    pool: &SqlitePool,
    user_id: &Uuid,
    entry_id: &Uuid,
    now: DateTime<Utc>,
    tz_offset_minutes: i32,
) -> Result<(TimeEntry, Option<StopSessionResponse>), TimeEntryError> {
    let row: TimeEntryRow = sqlx::query_as("SELECT * FROM time_entries WHERE id = ? AND user_id = ?")
        .bind(entry_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(TimeEntryError::NotFound)?;

    let mut entry = row.to_shared()?;
    if !entry.is_running {
        return Err(TimeEntryError::NotRunning);
    }

    // Settle before touching the entry. If settlement is rejected the timer
    // stays running and the stop can be retried; a stopped-but-unsettled
    // entry would silently drop the session from the challenge ledger.
    let settlement = match entry.challenge_id {
        Some(challenge_id) => Some(
            settlement::stop_session(
                pool,
                user_id,
                &challenge_id,
                entry.start_time,
                now,
                now,
                tz_offset_minutes,
            )
            .await?,
        ),
        None => None,
    };

    entry.end_time = Some(now);
    entry.duration_seconds = (now - entry.start_time).num_seconds().max(0);
    entry.is_running = false;

    sqlx::query(
        "UPDATE time_entries SET end_time = ?, duration_seconds = ?, is_running = 0 WHERE id = ?",
    )
    .bind(now)
    .bind(entry.duration_seconds)
    .bind(entry_id.to_string())
    .execute(pool)
    .await?;

    Ok((entry, settlement))
}

pub async fn list_entries(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<Vec<TimeEntry>, TimeEntryError> {
    let rows: Vec<TimeEntryRow> = sqlx::query_as(
        "SELECT * FROM time_entries WHERE user_id = ? ORDER BY start_time DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| r.to_shared())
        .collect::<Result<_, _>>()?)
}
