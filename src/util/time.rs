use chrono::{DateTime, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days elapsed from `earlier` to `now`. Negative if `earlier` is in the future.
#[must_use]
pub fn days_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - earlier).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Whole hours elapsed from `earlier` to `now`, floored.
#[must_use]
pub fn hours_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - earlier).num_hours()
}

/// Rounds to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}
