//! Performance score and trend derived from an aggregate's daily history.
//!
//! Recent window: the last `trend_window_days` days. Baseline: up to
//! `baseline_window_days` days immediately before it.

use insights_core::config::MonitorConfig;
use insights_core::{DailySeries, DailyTotals, MetricName, Trend};

/// Conversions per unit of spend, with spend floored at one.
fn efficiency(days: &[DailyTotals]) -> f64 {
    let conversions: f64 = days.iter().map(|d| d.totals.get(MetricName::Conversions)).sum();
    let cost: f64 = days.iter().map(|d| d.totals.get(MetricName::Cost)).sum();
    conversions / cost.max(1.0)
}

/// Mean daily value of `metric` over `days`; zero for an empty slice.
pub(crate) fn daily_mean(days: &[DailyTotals], metric: MetricName) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    days.iter().map(|d| d.totals.get(metric)).sum::<f64>() / days.len() as f64
}

/// Score in [0, 1]: half the ratio of recent to baseline efficiency, so 0.5
/// means "on par with its own history". Without baseline activity the score
/// is neutral (0.5), or 1.0 when the recent window already converts.
pub fn performance_score(series: &DailySeries, config: &MonitorConfig) -> f64 {
    let (baseline, recent) = series.split_recent(config.trend_window_days, config.baseline_window_days);
    let baseline_eff = efficiency(baseline);
    let recent_eff = efficiency(recent);

    if baseline_eff <= 0.0 {
        return if recent_eff > 0.0 { 1.0 } else { 0.5 };
    }
    (recent_eff / baseline_eff / 2.0).clamp(0.0, 1.0)
}

/// Trend of daily conversions over the recent window. The least-squares
/// slope is scaled to a relative change across the window and compared with
/// `performance_drop` in both directions.
pub fn classify_trend(series: &DailySeries, config: &MonitorConfig) -> Trend {
    let (_, recent) = series.split_recent(config.trend_window_days, 0);
    let values: Vec<f64> = recent
        .iter()
        .map(|d| d.totals.get(MetricName::Conversions))
        .collect();
    if values.len() < 2 {
        return Trend::Stable;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean <= 0.0 {
        return Trend::Stable;
    }

    let relative_change = linear_slope(&values) * (values.len() - 1) as f64 / mean;
    if relative_change < -config.performance_drop {
        Trend::Declining
    } else if relative_change > config.performance_drop {
        Trend::Improving
    } else {
        Trend::Stable
    }
}

/// Least-squares slope of `values` against their index.
fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i * i) as f64).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(days: &[(f64, f64)]) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        DailySeries::from_points(days.iter().enumerate().flat_map(|(i, (conv, cost))| {
            let date = start + Duration::days(i as i64);
            [
                (date, MetricName::Conversions, *conv),
                (date, MetricName::Cost, *cost),
            ]
        }))
    }

    #[test]
    fn test_slope_of_line() {
        assert!((linear_slope(&[1.0, 3.0, 5.0, 7.0]) - 2.0).abs() < 1e-12);
        assert_eq!(linear_slope(&[4.0]), 0.0);
    }

    #[test]
    fn test_score_neutral_without_history() {
        let config = MonitorConfig::default();
        assert_eq!(performance_score(&DailySeries::default(), &config), 0.5);
        assert_eq!(performance_score(&series(&[(0.0, 0.0); 40]), &config), 0.5);
        // Only recent activity: nothing to compare against yet.
        assert_eq!(performance_score(&series(&[(3.0, 10.0); 5]), &config), 1.0);
    }

    #[test]
    fn test_score_on_par_is_half() {
        let config = MonitorConfig::default();
        let s = series(&[(5.0, 50.0); 35]);
        assert!((performance_score(&s, &config) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_score_drops_with_efficiency() {
        let config = MonitorConfig::default();
        let mut days = vec![(10.0, 100.0); 28];
        days.extend(vec![(1.0, 100.0); 7]);
        let score = performance_score(&series(&days), &config);
        assert!((score - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_trend_classification() {
        let config = MonitorConfig::default();
        let falling: Vec<(f64, f64)> = (0..7).map(|i| (10.0 - i as f64, 10.0)).collect();
        assert_eq!(classify_trend(&series(&falling), &config), Trend::Declining);

        let rising: Vec<(f64, f64)> = (0..7).map(|i| (4.0 + i as f64, 10.0)).collect();
        assert_eq!(classify_trend(&series(&rising), &config), Trend::Improving);

        assert_eq!(classify_trend(&series(&[(6.0, 1.0); 7]), &config), Trend::Stable);
        assert_eq!(classify_trend(&series(&[(6.0, 1.0)]), &config), Trend::Stable);
        assert_eq!(classify_trend(&series(&[(0.0, 1.0); 7]), &config), Trend::Stable);
    }

    #[test]
    fn test_trend_only_looks_at_recent_window() {
        let config = MonitorConfig::default();
        // A crash long ago followed by a flat week.
        let mut days: Vec<(f64, f64)> = (0..10).map(|i| (50.0 - 5.0 * i as f64, 1.0)).collect();
        days.extend(vec![(5.0, 1.0); 7]);
        assert_eq!(classify_trend(&series(&days), &config), Trend::Stable);
    }
}
