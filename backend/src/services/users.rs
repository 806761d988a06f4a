use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserRow;
use shared::StreakSummary;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,
    #[error("Corrupt stored record: {0}")]
    CorruptRecord(#[from] crate::models::ModelError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub async fn get_streak_summary(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<StreakSummary, UserError> {
    let row: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::NotFound)?;

    let user = row.to_shared()?;

    Ok(StreakSummary {
        overall_streak: user.overall_streak,
        longest_overall_streak: user.longest_overall_streak,
        last_overall_streak_date: user.last_overall_streak_date,
        streak_shields: user.streak_shields,
        streak_shields_used: user.streak_shields_used,
    })
}
