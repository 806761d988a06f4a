use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ChallengeRow, UserRow};
use crate::services::{bets, clock, ledger, overall_streak, streak};
use crate::services::streak::StreakOutcome;
use shared::{
    BetUnlockInfo, Challenge, ChallengeFailureInfo, SafeDayInfo, StopSessionResponse, User,
};

pub const FAILURE_REASON: &str = "Missed daily goal with no safe days remaining";

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Challenge not found")]
    ChallengeNotFound,
    #[error("Challenge is not active")]
    ChallengeNotActive,
    #[error("User not found")]
    UserNotFound,
    #[error("Corrupt stored record: {0}")]
    CorruptRecord(#[from] crate::models::ModelError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Settle one stopped session against a challenge. This is the single entry
/// point for both the challenge-scoped and the timer-scoped stop paths.
///
/// Everything runs inside one transaction: the ledger update, the streak
/// evaluation, the sweep over the user's other challenges, shield
/// consumption, and the overall-streak advance either all commit or none do.
pub async fn stop_session(
    pool: &SqlitePool,
    user_id: &Uuid,
    challenge_id: &Uuid,
    session_start: DateTime<Utc>,
    session_end: DateTime<Utc>,
    now: DateTime<Utc>,
    tz_offset_minutes: i32,
) -> Result<StopSessionResponse, SettlementError> {
    let (today, yesterday) = clock::day_pair(now, tz_offset_minutes);

    let mut tx = pool.begin().await?;

    let rows: Vec<ChallengeRow> = sqlx::query_as("SELECT * FROM challenges WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_all(&mut *tx)
        .await?;
    let mut challenges: Vec<Challenge> = rows
        .iter()
        .map(|r| r.to_shared())
        .collect::<Result<_, _>>()?;

    let idx = challenges
        .iter()
        .position(|c| c.id == *challenge_id)
        .ok_or(SettlementError::ChallengeNotFound)?;

    if !challenges[idx].is_settleable() {
        return Err(SettlementError::ChallengeNotActive);
    }

    let user_row: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(SettlementError::UserNotFound)?;
    let mut user = user_row.to_shared()?;

    let outcome = ledger::record_session(&mut challenges[idx], session_start, session_end, &today);

    let mut changed = vec![false; challenges.len()];
    changed[idx] = true;

    let mut safe_day_info: Option<SafeDayInfo> = None;
    let mut failure_info: Option<ChallengeFailureInfo> = None;
    let mut bet_unlock_info: Option<BetUnlockInfo> = None;
    let mut shield_consumed = false;
    let mut any_failure = false;
    let mut user_changed = false;

    if outcome.goal_just_reached {
        // Streak evaluation for the stopped challenge.
        match streak::evaluate(&mut challenges[idx], &today, &yesterday) {
            StreakOutcome::Extended => {}
            StreakOutcome::SavedByLifeline => {
                let c = &challenges[idx];
                log::info!(
                    "challenge {} used a safe day for {} ({} left)",
                    c.id,
                    yesterday,
                    c.safe_days_remaining
                );
                safe_day_info = Some(SafeDayInfo {
                    challenge_title: c.title.clone(),
                    date_covered: yesterday.clone(),
                    safe_days_remaining: c.safe_days_remaining,
                });
            }
            StreakOutcome::Failed => {
                bets::fail_challenge(&mut challenges[idx], &yesterday, FAILURE_REASON);
                let shield_used =
                    overall_streak::protect_or_reset(&mut user, &yesterday, &challenges[idx].title);
                shield_consumed |= shield_used;
                any_failure = true;
                user_changed = true;

                let c = &challenges[idx];
                log::warn!("challenge {} failed (missed {})", c.id, yesterday);
                failure_info = Some(ChallengeFailureInfo {
                    challenge_title: c.title.clone(),
                    failed_date: yesterday.clone(),
                    reason: FAILURE_REASON.to_string(),
                    longest_streak: c.longest_streak,
                    shield_used,
                    shields_remaining: user.streak_shields,
                });
            }
        }

        // Milestone unlocks and completion for the stopped challenge.
        if !challenges[idx].has_failed {
            let mut unlocked = bets::unlock_due_milestones(&mut challenges[idx], now);
            let completed = challenges[idx].current_streak >= challenges[idx].duration_days;
            if completed {
                unlocked.extend(bets::complete_challenge(&mut challenges[idx], now));
                log::info!("challenge {} completed, bet returned", challenges[idx].id);
            }
            if completed || !unlocked.is_empty() {
                let c = &challenges[idx];
                bet_unlock_info = Some(BetUnlockInfo {
                    challenge_title: c.title.clone(),
                    unlocked_bets: unlocked,
                    challenge_completed: completed,
                    longest_streak: c.longest_streak,
                });
            }
        }

        // Sweep the user's other active challenges: a running streak whose
        // yesterday is uncovered either spends a safe day now or fails now.
        for (i, c) in challenges.iter_mut().enumerate() {
            if i == idx || !streak::yesterday_missed(c, &today, &yesterday) {
                continue;
            }
            changed[i] = true;

            if c.safe_days_remaining > 0 {
                streak::consume_lifeline(c, &yesterday);
                log::info!(
                    "challenge {} used a safe day for {} ({} left)",
                    c.id,
                    yesterday,
                    c.safe_days_remaining
                );
                if safe_day_info.is_none() {
                    safe_day_info = Some(SafeDayInfo {
                        challenge_title: c.title.clone(),
                        date_covered: yesterday.clone(),
                        safe_days_remaining: c.safe_days_remaining,
                    });
                }
            } else {
                bets::fail_challenge(c, &yesterday, FAILURE_REASON);
                let shield_used = overall_streak::protect_or_reset(&mut user, &yesterday, &c.title);
                shield_consumed |= shield_used;
                any_failure = true;
                user_changed = true;

                log::warn!("challenge {} failed (missed {})", c.id, yesterday);
                if failure_info.is_none() {
                    failure_info = Some(ChallengeFailureInfo {
                        challenge_title: c.title.clone(),
                        failed_date: yesterday.clone(),
                        reason: FAILURE_REASON.to_string(),
                        longest_streak: c.longest_streak,
                        shield_used,
                        shields_remaining: user.streak_shields,
                    });
                }
            }
        }

        // Overall-streak aggregation. Failure and advancement are mutually
        // exclusive within one settlement cycle.
        if !any_failure && all_obligations_reached(&challenges, &today) {
            let advanced =
                overall_streak::maybe_advance(&mut user, &today, &yesterday, !shield_consumed);
            if advanced != overall_streak::AdvanceOutcome::AlreadyAdvanced {
                user_changed = true;
                log::info!(
                    "user {} overall streak now {}",
                    user.id,
                    user.overall_streak
                );
            }
        }
    }

    for (i, c) in challenges.iter().enumerate() {
        if changed[i] {
            save_challenge(&mut tx, c, now).await?;
        }
    }
    if user_changed {
        save_user_streak(&mut tx, &user, now).await?;
    }

    tx.commit().await?;

    Ok(StopSessionResponse {
        challenge: challenges[idx].clone(),
        minutes_logged_today: outcome.minutes_today,
        goal_reached: outcome.goal_reached,
        target_minutes: challenges[idx].daily_target_minutes,
        safe_day_info,
        failure_info,
        bet_unlock_info,
    })
}

/// Every challenge that still counts toward today reached its goal. Failed
/// challenges are out; completed ones count only on their completion day.
fn all_obligations_reached(challenges: &[Challenge], today: &str) -> bool {
    challenges
        .iter()
        .filter(|c| counts_toward_today(c, today))
        .all(|c| c.goal_reached_on(today))
}

fn counts_toward_today(challenge: &Challenge, today: &str) -> bool {
    if challenge.has_failed {
        return false;
    }
    if challenge.is_completed {
        return challenge.last_completed_date.as_deref() == Some(today);
    }
    challenge.is_active
}

/// Write back the mutable settlement fields of one challenge aggregate.
async fn save_challenge(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    challenge: &Challenge,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let conn: &mut SqliteConnection = tx;
    sqlx::query(
        r#"
        UPDATE challenges SET
            bet_items = ?,
            safe_days_remaining = ?,
            safe_days_used = ?,
            current_streak = ?,
            longest_streak = ?,
            completed_days = ?,
            total_minutes = ?,
            is_active = ?,
            is_completed = ?,
            is_bet_locked = ?,
            is_bet_returned = ?,
            has_failed = ?,
            failed_dates = ?,
            completed_at = ?,
            last_completed_date = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(serde_json::to_string(&challenge.bet_items).unwrap_or_default())
    .bind(challenge.safe_days_remaining)
    .bind(serde_json::to_string(&challenge.safe_days_used).unwrap_or_default())
    .bind(challenge.current_streak)
    .bind(challenge.longest_streak)
    .bind(serde_json::to_string(&challenge.completed_days).unwrap_or_default())
    .bind(challenge.total_minutes)
    .bind(challenge.is_active)
    .bind(challenge.is_completed)
    .bind(challenge.is_bet_locked)
    .bind(challenge.is_bet_returned)
    .bind(challenge.has_failed)
    .bind(serde_json::to_string(&challenge.failed_dates).unwrap_or_default())
    .bind(challenge.completed_at)
    .bind(&challenge.last_completed_date)
    .bind(now)
    .bind(challenge.id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

async fn save_user_streak(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user: &User,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let conn: &mut SqliteConnection = tx;
    sqlx::query(
        r#"
        UPDATE users SET
            overall_streak = ?,
            longest_overall_streak = ?,
            last_overall_streak_date = ?,
            streak_shields = ?,
            last_shield_earned_at = ?,
            streak_shields_used = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(user.overall_streak)
    .bind(user.longest_overall_streak)
    .bind(&user.last_overall_streak_date)
    .bind(user.streak_shields)
    .bind(user.last_shield_earned_at)
    .bind(serde_json::to_string(&user.streak_shields_used).unwrap_or_default())
    .bind(now)
    .bind(user.id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}
