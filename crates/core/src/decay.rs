//! Recency primitives shared by attribution, forecasting and signal ranking.

use chrono::{DateTime, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days elapsed between `at` and `now`. Future timestamps count as
/// age zero.
pub fn age_in_days(at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - at).num_milliseconds().max(0) as f64;
    millis / MILLIS_PER_DAY
}

/// Exponential weight `2^(-age / half_life)`.
///
/// A non-positive half-life collapses to a step: full weight at age zero,
/// nothing afterwards.
pub fn half_life_weight(age_days: f64, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 {
        return if age_days <= 0.0 { 1.0 } else { 0.0 };
    }
    2f64.powf(-age_days.max(0.0) / half_life_days)
}

/// Linear boost that starts at `max_points` and loses one point every
/// `days_per_point` days, floored at zero.
pub fn linear_recency_boost(age_days: f64, max_points: f64, days_per_point: f64) -> f64 {
    if days_per_point <= 0.0 {
        return 0.0;
    }
    (max_points - age_days.max(0.0) / days_per_point).max(0.0)
}
