use chrono::{DateTime, Utc};

use shared::{Challenge, DailyEntry, SessionRecord};

/// Result of folding one session into a challenge's daily ledger.
#[derive(Debug, Clone, Copy)]
pub struct SessionOutcome {
    #[allow(dead_code)]
    pub minutes_added: i64,
    pub minutes_today: i64,
    pub goal_reached: bool,
    /// True only on the false→true transition of today's goal flag. This is
    /// the sole trigger for streak evaluation; later sessions on an already
    /// reached day must not re-trigger it.
    pub goal_just_reached: bool,
}

/// Fold a finished session into today's ledger entry, creating the entry if
/// this is the first session of the day. The session duration is recomputed
/// from the timestamps; client-supplied durations are never trusted.
pub fn record_session(
    challenge: &mut Challenge,
    session_start: DateTime<Utc>,
    session_end: DateTime<Utc>,
    today: &str,
) -> SessionOutcome {
    let duration_seconds = (session_end - session_start).num_seconds().max(0);
    let minutes = duration_seconds / 60;
    let leftover_seconds = duration_seconds % 60;

    let target = challenge.daily_target_minutes;

    if challenge.day_entry(today).is_none() {
        challenge.completed_days.push(DailyEntry {
            date: today.to_string(),
            minutes_accumulated: 0,
            seconds_accumulated: 0,
            goal_reached: false,
            sessions: vec![],
        });
        // The ledger stays ordered by date; YYYY-MM-DD sorts chronologically.
        challenge.completed_days.sort_by(|a, b| a.date.cmp(&b.date));
    }

    let entry = challenge
        .completed_days
        .iter_mut()
        .find(|d| d.date == today)
        .expect("entry for today exists after insertion");

    let was_reached = entry.goal_reached;

    entry.sessions.push(SessionRecord {
        start_time: session_start,
        end_time: session_end,
        duration_minutes: minutes,
    });

    entry.minutes_accumulated += minutes;
    entry.seconds_accumulated += leftover_seconds;
    if entry.seconds_accumulated >= 60 {
        entry.minutes_accumulated += entry.seconds_accumulated / 60;
        entry.seconds_accumulated %= 60;
    }

    entry.goal_reached = entry.minutes_accumulated >= target;

    let outcome = SessionOutcome {
        minutes_added: minutes,
        minutes_today: entry.minutes_accumulated,
        goal_reached: entry.goal_reached,
        goal_just_reached: !was_reached && entry.goal_reached,
    };

    // Delta only, so re-saving a challenge never double-counts.
    challenge.total_minutes += minutes;

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::BetMode;
    use uuid::Uuid;

    fn challenge(target_minutes: i64) -> Challenge {
        let now = Utc::now();
        Challenge {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Study".to_string(),
            description: "".to_string(),
            duration_days: 30,
            daily_target_minutes: target_minutes,
            scheduled_start_time: None,
            start_time_required: false,
            bet_mode: BetMode::Single,
            bet_items: vec![],
            total_bets: 1,
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

    fn session(minutes: i64, seconds: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap();
        (start, start + chrono::Duration::seconds(minutes * 60 + seconds))
    }

    #[test]
    fn test_first_session_creates_entry() {
        let mut c = challenge(60);
        let (start, end) = session(25, 0);

        let outcome = record_session(&mut c, start, end, "2025-03-05");

        assert_eq!(c.completed_days.len(), 1);
        assert_eq!(c.completed_days[0].date, "2025-03-05");
        assert_eq!(outcome.minutes_today, 25);
        assert!(!outcome.goal_reached);
        assert!(!outcome.goal_just_reached);
        assert_eq!(c.total_minutes, 25);
    }

    #[test]
    fn test_goal_transition_fires_once() {
        let mut c = challenge(60);

        let (s1, e1) = session(40, 0);
        let first = record_session(&mut c, s1, e1, "2025-03-05");
        assert!(!first.goal_just_reached);

        let (s2, e2) = session(25, 0);
        let second = record_session(&mut c, s2, e2, "2025-03-05");
        assert!(second.goal_reached);
        assert!(second.goal_just_reached);
        assert_eq!(second.minutes_today, 65);

        // Further sessions after the goal is met must not re-trigger.
        let (s3, e3) = session(10, 0);
        let third = record_session(&mut c, s3, e3, "2025-03-05");
        assert!(third.goal_reached);
        assert!(!third.goal_just_reached);
    }

    #[test]
    fn test_seconds_overflow_carries_into_minutes() {
        let mut c = challenge(60);

        let (s1, e1) = session(10, 40);
        record_session(&mut c, s1, e1, "2025-03-05");
        let (s2, e2) = session(10, 35);
        record_session(&mut c, s2, e2, "2025-03-05");

        let entry = &c.completed_days[0];
        assert_eq!(entry.minutes_accumulated, 21);
        assert_eq!(entry.seconds_accumulated, 15);
    }

    #[test]
    fn test_sessions_on_distinct_days_get_distinct_entries() {
        let mut c = challenge(30);
        let (s, e) = session(30, 0);

        record_session(&mut c, s, e, "2025-03-05");
        record_session(&mut c, s, e, "2025-03-06");

        assert_eq!(c.completed_days.len(), 2);
        assert_eq!(c.completed_days[0].date, "2025-03-05");
        assert_eq!(c.completed_days[1].date, "2025-03-06");
        assert_eq!(c.total_minutes, 60);
    }

    #[test]
    fn test_ledger_stays_sorted_when_backfilling() {
        let mut c = challenge(30);
        let (s, e) = session(30, 0);

        record_session(&mut c, s, e, "2025-03-06");
        record_session(&mut c, s, e, "2025-03-05");

        let dates: Vec<&str> = c.completed_days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-03-05", "2025-03-06"]);
    }

    #[test]
    fn test_negative_duration_clamped_to_zero() {
        let mut c = challenge(30);
        let start = Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap();
        let end = start - chrono::Duration::minutes(5);

        let outcome = record_session(&mut c, start, end, "2025-03-05");

        assert_eq!(outcome.minutes_added, 0);
        assert_eq!(c.total_minutes, 0);
    }
}
