use shared::{Challenge, SafeDayUse};

pub const MISSED_GOAL_REASON: &str = "Missed daily goal";

/// What happened to a challenge's streak when today's goal was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakOutcome {
    /// Yesterday was covered (or this is a fresh start); streak grew by one.
    Extended,
    /// Yesterday was missed but a safe day absorbed it; streak still grew.
    SavedByLifeline,
    /// Yesterday was missed and no safe days remain. The caller settles the
    /// bet and resets the streak.
    Failed,
}

/// Advance, save, or fail a challenge's streak. Must be called exactly once
/// per false→true goal transition (`SessionOutcome::goal_just_reached`);
/// calling it on every session would double-count days.
pub fn evaluate(challenge: &mut Challenge, today: &str, yesterday: &str) -> StreakOutcome {
    let fresh_start = challenge.current_streak == 0;
    let yesterday_covered =
        challenge.goal_reached_on(yesterday) || challenge.lifeline_used_on(yesterday);

    if fresh_start || yesterday_covered {
        extend(challenge, today);
        return StreakOutcome::Extended;
    }

    if challenge.safe_days_remaining > 0 {
        consume_lifeline(challenge, yesterday);
        extend(challenge, today);
        return StreakOutcome::SavedByLifeline;
    }

    StreakOutcome::Failed
}

/// A running streak whose previous day has neither a reached goal nor a
/// consumed lifeline is broken; the sweep in the settlement path uses this to
/// catch misses on challenges other than the one that was just stopped.
///
/// A challenge that already settled today is exempt: its own evaluation ran
/// when its goal was reached, and a fresh start earlier today never owed
/// anything for yesterday.
pub fn yesterday_missed(challenge: &Challenge, today: &str, yesterday: &str) -> bool {
    challenge.is_settleable()
        && challenge.current_streak > 0
        && challenge.last_completed_date.as_deref() != Some(today)
        && !challenge.goal_reached_on(yesterday)
        && !challenge.lifeline_used_on(yesterday)
}

/// Spend one safe day to cover `date`. The streak itself is untouched; it
/// grows only when a goal is actually reached.
pub fn consume_lifeline(challenge: &mut Challenge, date: &str) {
    challenge.safe_days_remaining -= 1;
    challenge.safe_days_used.push(SafeDayUse {
        date: date.to_string(),
        reason: MISSED_GOAL_REASON.to_string(),
    });
}

fn extend(challenge: &mut Challenge, today: &str) {
    challenge.current_streak += 1;
    challenge.longest_streak = challenge.longest_streak.max(challenge.current_streak);
    challenge.last_completed_date = Some(today.to_string());
}
