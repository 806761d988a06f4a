use shared::{ShieldUse, User};

/// A shield is earned every 15 days of unbroken overall streak.
pub const SHIELD_AWARD_INTERVAL: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Already advanced today; nothing changed.
    AlreadyAdvanced,
    Advanced { shield_awarded: bool },
}

/// Advance the user's cross-challenge streak for `today`. The caller has
/// already verified that every active challenge reached its goal today.
/// Idempotent per day. `allow_shield_award` is false when a shield was
/// consumed earlier in the same settlement; earning and consuming a shield
/// are mutually exclusive within one transaction.
pub fn maybe_advance(
    user: &mut User,
    today: &str,
    yesterday: &str,
    allow_shield_award: bool,
) -> AdvanceOutcome {
    if user.last_overall_streak_date.as_deref() == Some(today) {
        return AdvanceOutcome::AlreadyAdvanced;
    }

    let chain_intact =
        user.last_overall_streak_date.as_deref() == Some(yesterday) || user.overall_streak == 0;

    if chain_intact {
        user.overall_streak += 1;
    } else {
        // The chain was already broken before this settlement; failures were
        // penalized when they happened, so this is just a new day one.
        user.overall_streak = 1;
    }

    user.longest_overall_streak = user.longest_overall_streak.max(user.overall_streak);
    user.last_overall_streak_date = Some(today.to_string());

    let mut shield_awarded = false;
    if allow_shield_award
        && user.overall_streak > 0
        && user.overall_streak % SHIELD_AWARD_INTERVAL == 0
        && user.last_shield_earned_at < user.overall_streak
    {
        user.streak_shields += 1;
        user.last_shield_earned_at = user.overall_streak;
        shield_awarded = true;
    }

    AdvanceOutcome::Advanced { shield_awarded }
}

/// Absorb one challenge failure: consume a shield if the user has one,
/// otherwise void the whole overall streak. Returns true when a shield was
/// spent. Evaluated per failing challenge; two failures in a day cost two
/// shields (or one shield and the streak).
pub fn protect_or_reset(user: &mut User, missed_date: &str, challenge_title: &str) -> bool {
    if user.streak_shields > 0 {
        user.streak_shields -= 1;
        user.streak_shields_used.push(ShieldUse {
            date: missed_date.to_string(),
            reason: format!(
                "Protected overall streak when {} failed",
                challenge_title
            ),
            overall_streak_at_time: user.overall_streak,
        });
        true
    } else {
        user.overall_streak = 0;
        false
    }
}
