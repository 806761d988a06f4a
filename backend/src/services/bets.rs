use chrono::{DateTime, Utc};

use shared::{BetMode, Challenge, FailedDate, UnlockedBet};

/// Marker left in place of a destroyed stake.
pub const DELETED_BET_NAME: &str = "[deleted]";

/// Fail a challenge terminally: the streak is voided and the stake is
/// destroyed. Failure is stronger than any unlock, so the bet stays locked
/// forever. Payloads are wiped for multi-mode items too, unlocked or not.
pub fn fail_challenge(challenge: &mut Challenge, missed_date: &str, reason: &str) {
    challenge.has_failed = true;
    challenge.is_active = false;
    challenge.is_bet_locked = true;
    challenge.is_bet_returned = false;
    challenge.current_streak = 0;
    challenge.failed_dates.push(FailedDate {
        date: missed_date.to_string(),
        reason: reason.to_string(),
    });

    for item in &mut challenge.bet_items {
        item.name = DELETED_BET_NAME.to_string();
        item.payload = String::new();
        item.size_bytes = 0;
    }
}

/// Unlock every multi-mode milestone the current streak has reached. Iterates
/// all items rather than just the next one, so a streak that jumps past two
/// thresholds unlocks both in one settlement.
pub fn unlock_due_milestones(challenge: &mut Challenge, now: DateTime<Utc>) -> Vec<UnlockedBet> {
    if challenge.bet_mode != BetMode::Multi {
        return vec![];
    }

    let streak = challenge.current_streak;
    let mut unlocked = vec![];

    for item in &mut challenge.bet_items {
        let due = item.unlock_day.map(|d| streak >= d).unwrap_or(false);
        if !item.is_unlocked && due {
            item.is_unlocked = true;
            item.unlocked_at = Some(now);
            unlocked.push(UnlockedBet {
                name: item.name.clone(),
                milestone_index: item.milestone_index,
            });
        }
    }

    unlocked
}

/// Complete a challenge: return the stake and force-unlock any multi items
/// still locked, whatever their threshold. The challenge stays active through
/// its completion day; the next day's read pass deactivates it.
pub fn complete_challenge(challenge: &mut Challenge, now: DateTime<Utc>) -> Vec<UnlockedBet> {
    challenge.is_completed = true;
    challenge.completed_at = Some(now);
    challenge.is_bet_returned = true;
    challenge.is_bet_locked = false;

    let mut unlocked = vec![];
    for item in &mut challenge.bet_items {
        if !item.is_unlocked {
            item.is_unlocked = true;
            item.unlocked_at = Some(now);
            unlocked.push(UnlockedBet {
                name: item.name.clone(),
                milestone_index: item.milestone_index,
            });
        }
    }

    unlocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::BetItem;
    use uuid::Uuid;

    fn bet_item(name: &str, milestone: Option<i32>, unlock_day: Option<i32>) -> BetItem {
        BetItem {
            name: name.to_string(),
            size_bytes: 2048,
            mime_type: "application/pdf".to_string(),
            payload: "cGF5bG9hZA==".to_string(),
            uploaded_at: Utc::now(),
            milestone_index: milestone,
            unlock_day,
            is_unlocked: false,
            unlocked_at: None,
        }
    }

    fn challenge(mode: BetMode, items: Vec<BetItem>) -> Challenge {
        let now = Utc::now();
        Challenge {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Write thesis".to_string(),
            description: "".to_string(),
            duration_days: 30,
            daily_target_minutes: 60,
            scheduled_start_time: None,
            start_time_required: false,
            bet_mode: mode,
            total_bets: items.len() as i32,
            bet_items: items,
            safe_days_total: 0,
            safe_days_remaining: 0,
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
        }
    }

    #[test]
    fn test_fail_challenge_destroys_stake() {
        let mut c = challenge(BetMode::Single, vec![bet_item("diary.pdf", None, None)]);
        c.current_streak = 4;

        fail_challenge(&mut c, "2025-03-04", "Missed daily goal with no safe days left");

        assert!(c.has_failed);
        assert!(c.is_bet_locked);
        assert!(!c.is_bet_returned);
        assert!(!c.is_active);
        assert_eq!(c.current_streak, 0);
        assert_eq!(c.failed_dates.len(), 1);
        assert_eq!(c.failed_dates[0].date, "2025-03-04");
        assert_eq!(c.bet_items[0].name, DELETED_BET_NAME);
        assert!(c.bet_items[0].payload.is_empty());
        assert_eq!(c.bet_items[0].size_bytes, 0);
    }

    #[test]
    fn test_fail_challenge_wipes_multi_items_even_if_unlocked() {
        let mut items = vec![
            bet_item("a.jpg", Some(1), Some(10)),
            bet_item("b.jpg", Some(2), Some(20)),
        ];
        items[0].is_unlocked = true;
        let mut c = challenge(BetMode::Multi, items);

        fail_challenge(&mut c, "2025-03-10", "Missed daily goal with no safe days left");

        for item in &c.bet_items {
            assert!(item.payload.is_empty());
            assert_eq!(item.name, DELETED_BET_NAME);
        }
        assert!(c.is_bet_locked);
    }

    #[test]
    fn test_unlock_due_milestones() {
        let mut c = challenge(
            BetMode::Multi,
            vec![
                bet_item("a.jpg", Some(1), Some(15)),
                bet_item("b.jpg", Some(2), Some(30)),
            ],
        );
        c.current_streak = 15;

        let unlocked = unlock_due_milestones(&mut c, Utc::now());

        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].name, "a.jpg");
        assert!(c.bet_items[0].is_unlocked);
        assert!(c.bet_items[0].unlocked_at.is_some());
        assert!(!c.bet_items[1].is_unlocked);
    }

    #[test]
    fn test_unlock_handles_skipped_thresholds() {
        let mut c = challenge(
            BetMode::Multi,
            vec![
                bet_item("a.jpg", Some(1), Some(5)),
                bet_item("b.jpg", Some(2), Some(10)),
                bet_item("c.jpg", Some(3), Some(20)),
            ],
        );
        c.current_streak = 12;

        let unlocked = unlock_due_milestones(&mut c, Utc::now());

        assert_eq!(unlocked.len(), 2);
        assert!(!c.bet_items[2].is_unlocked);
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let mut c = challenge(BetMode::Multi, vec![bet_item("a.jpg", Some(1), Some(5))]);
        c.current_streak = 6;

        assert_eq!(unlock_due_milestones(&mut c, Utc::now()).len(), 1);
        assert_eq!(unlock_due_milestones(&mut c, Utc::now()).len(), 0);
    }

    #[test]
    fn test_unlock_noop_for_single_mode() {
        let mut c = challenge(BetMode::Single, vec![bet_item("diary.pdf", None, None)]);
        c.current_streak = 20;

        assert!(unlock_due_milestones(&mut c, Utc::now()).is_empty());
        assert!(!c.bet_items[0].is_unlocked);
    }

    #[test]
    fn test_complete_challenge_returns_stake() {
        let mut c = challenge(BetMode::Single, vec![bet_item("diary.pdf", None, None)]);
        c.current_streak = 30;
        let now = Utc::now();

        let unlocked = complete_challenge(&mut c, now);

        assert!(c.is_completed);
        assert!(!c.is_bet_locked);
        assert!(c.is_bet_returned);
        assert_eq!(c.completed_at, Some(now));
        assert_eq!(unlocked.len(), 1);
        // Stays renderable as "done today"; the next read pass deactivates.
        assert!(c.is_active);
    }

    #[test]
    fn test_complete_force_unlocks_final_milestone() {
        let mut items = vec![
            bet_item("a.jpg", Some(1), Some(15)),
            bet_item("b.jpg", Some(2), Some(30)),
        ];
        items[0].is_unlocked = true;
        let mut c = challenge(BetMode::Multi, items);
        c.current_streak = 30;

        let unlocked = complete_challenge(&mut c, Utc::now());

        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].name, "b.jpg");
        assert!(c.bet_items.iter().all(|i| i.is_unlocked));
    }
}
