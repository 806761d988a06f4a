use chrono::{DateTime, Duration, Utc};

/// Local calendar day for a UTC instant, as a `YYYY-MM-DD` string.
///
/// Every streak comparison in the settlement path goes through these strings,
/// never through raw timestamps, so a session logged at 23:58 local and one
/// at 00:02 local land on different days regardless of serialization.
pub fn local_day(now: DateTime<Utc>, tz_offset_minutes: i32) -> String {
    let shifted = now + Duration::minutes(tz_offset_minutes as i64);
    shifted.format("%Y-%m-%d").to_string()
}

/// The (today, yesterday) pair used by one settlement. Yesterday is derived
/// from the same instant, not by string arithmetic, so it is always valid.
pub fn day_pair(now: DateTime<Utc>, tz_offset_minutes: i32) -> (String, String) {
    let today = local_day(now, tz_offset_minutes);
    let yesterday = local_day(now - Duration::days(1), tz_offset_minutes);
    (today, yesterday)
}
