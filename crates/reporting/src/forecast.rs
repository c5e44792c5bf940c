//! Short-horizon forecasting, seasonal peaks and predictive insights built
//! from the daily history of design aggregates.

use chrono::{DateTime, Duration, Utc, Weekday};
use insights_core::config::ForecastConfig;
use insights_core::decay::age_in_days;
use insights_core::{DailySeries, MetricAggregate, MetricName, TimeSeries};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_history_days(days: usize) -> Self {
        if days < 7 {
            Self::Low
        } else if days < 30 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Projected totals over `horizon_days`. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub horizon_days: u32,
    pub history_days: usize,
    pub estimated_impressions: u64,
    pub estimated_clicks: u64,
    pub estimated_conversions: u64,
    pub estimated_revenue: u64,
    pub estimated_cost: u64,
    pub confidence_level: ConfidenceLevel,
}

/// Busiest buckets of the summed time-series. `None` when nothing was
/// recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalTrends {
    pub peak_hour: Option<u32>,
    pub peak_weekday: Option<Weekday>,
    /// 1-based month.
    pub peak_month: Option<u32>,
    pub buckets: TimeSeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictiveInsights {
    pub forecasts: Vec<ForecastResult>,
    pub seasonal_trends: SeasonalTrends,
    /// Designs that spent money but returned less than they cost.
    pub underperforming_assets: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

pub struct ForecastEngine {
    config: ForecastConfig,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Forecast from the event history of `aggregates`.
    pub fn forecast(&self, aggregates: &[MetricAggregate], horizon_days: u32) -> ForecastResult {
        self.forecast_series(&DailySeries::from_aggregates(aggregates), horizon_days)
    }

    /// Mean per-day value of each metric times the horizon, rounded to the
    /// nearest integer.
    pub fn forecast_series(&self, series: &DailySeries, horizon_days: u32) -> ForecastResult {
        let history_days = series.len();
        let totals = series.totals();
        let project = |metric: MetricName| -> u64 {
            if history_days == 0 {
                return 0;
            }
            let per_day = totals.get(metric) / history_days as f64;
            (per_day * f64::from(horizon_days)).round().max(0.0) as u64
        };

        ForecastResult {
            horizon_days,
            history_days,
            estimated_impressions: project(MetricName::Impressions),
            estimated_clicks: project(MetricName::Clicks),
            estimated_conversions: project(MetricName::Conversions),
            estimated_revenue: project(MetricName::Revenue),
            estimated_cost: project(MetricName::Cost),
            confidence_level: ConfidenceLevel::from_history_days(history_days),
        }
    }

    pub fn seasonal_trends(&self, aggregates: &[MetricAggregate]) -> SeasonalTrends {
        let mut buckets = TimeSeries::default();
        for aggregate in aggregates {
            buckets.merge(&aggregate.time_series);
        }

        let peak_weekday = peak_index(&buckets.daily).map(|i| match i {
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            _ => Weekday::Sat,
        });

        SeasonalTrends {
            peak_hour: peak_index(&buckets.hourly).map(|i| i as u32),
            peak_weekday,
            peak_month: peak_index(&buckets.monthly).map(|i| i as u32 + 1),
            buckets,
        }
    }

    /// Forecasts for every configured horizon over the lookback window, plus
    /// seasonal peaks and money-losing designs.
    pub fn insights(&self, aggregates: &[MetricAggregate]) -> PredictiveInsights {
        let now = Utc::now();
        let lookback = f64::from(self.config.lookback_days);
        let recent: Vec<MetricAggregate> = aggregates
            .iter()
            .filter(|a| age_in_days(a.updated_at, now) <= lookback)
            .cloned()
            .collect();

        let cutoff = (now - Duration::days(i64::from(self.config.lookback_days))).date_naive();
        let series = DailySeries::from_aggregates(&recent).since(cutoff);

        let forecasts = self
            .config
            .horizons
            .iter()
            .map(|h| self.forecast_series(&series, *h))
            .collect();

        let mut underperforming_assets: Vec<String> = recent
            .iter()
            .filter(|a| {
                let cost = a.metric(MetricName::Cost);
                cost > 0.0 && a.metric(MetricName::Revenue) / cost < 1.0
            })
            .map(|a| a.design_id.clone())
            .collect();
        underperforming_assets.sort();
        underperforming_assets.dedup();

        debug!(
            aggregates = recent.len(),
            history_days = series.len(),
            "Predictive insights generated"
        );

        PredictiveInsights {
            forecasts,
            seasonal_trends: self.seasonal_trends(&recent),
            underperforming_assets,
            generated_at: now,
        }
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

/// Index of the largest positive bucket; earliest wins ties.
fn peak_index(buckets: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in buckets.iter().enumerate() {
        if *v > 0.0 && best.map_or(true, |(_, b)| *v > b) {
            best = Some((i, *v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use insights_core::{AggregateKey, Channel, Metadata};

    fn uniform_history(days: u32, impressions: f64) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        DailySeries::from_points((0..days).map(|d| {
            (
                start + Duration::days(i64::from(d)),
                MetricName::Impressions,
                impressions,
            )
        }))
    }

    #[test]
    fn test_empty_history_forecasts_zero() {
        let engine = ForecastEngine::default();
        let result = engine.forecast(&[], 30);
        assert_eq!(result.estimated_impressions, 0);
        assert_eq!(result.estimated_clicks, 0);
        assert_eq!(result.estimated_conversions, 0);
        assert_eq!(result.estimated_revenue, 0);
        assert_eq!(result.estimated_cost, 0);
        assert_eq!(result.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_ten_days_uniform_history() {
        let engine = ForecastEngine::default();
        let result = engine.forecast_series(&uniform_history(10, 100.0), 30);
        assert_eq!(result.estimated_impressions, 3_000);
        assert_eq!(result.history_days, 10);
        assert_eq!(result.confidence_level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(ConfidenceLevel::from_history_days(0), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_history_days(6), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_history_days(7), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_history_days(29), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_history_days(30), ConfidenceLevel::High);
    }

    #[test]
    fn test_forecast_rounds_to_nearest() {
        let engine = ForecastEngine::default();
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let series = DailySeries::from_points(vec![
            (start, MetricName::Clicks, 1.0),
            (start + Duration::days(2), MetricName::Revenue, 10.0),
        ]);
        // 1 click over 3 days -> 0.333/day -> 2.33 over 7 days.
        let result = engine.forecast_series(&series, 7);
        assert_eq!(result.estimated_clicks, 2);
        assert_eq!(result.estimated_revenue, 23);
    }

    #[test]
    fn test_forecast_from_aggregates_uses_event_days() {
        let engine = ForecastEngine::default();
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut agg = MetricAggregate::new(AggregateKey::new("d1", None), "b", t0);
        for d in 0..10 {
            agg.apply(
                Channel::Google,
                MetricName::Impressions,
                100.0,
                Metadata::new(),
                t0 + Duration::days(d),
            );
        }
        let result = engine.forecast(&[agg], 30);
        assert_eq!(result.estimated_impressions, 3_000);
        assert_eq!(result.confidence_level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_seasonal_peaks() {
        let engine = ForecastEngine::default();
        // Friday 2024-03-15 18:00 UTC.
        let friday = Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap();
        let mut agg = MetricAggregate::new(AggregateKey::new("d1", None), "b", friday);
        agg.apply(Channel::Email, MetricName::Clicks, 5.0, Metadata::new(), friday);
        agg.apply(
            Channel::Email,
            MetricName::Clicks,
            1.0,
            Metadata::new(),
            friday + Duration::hours(20),
        );

        let trends = engine.seasonal_trends(&[agg]);
        assert_eq!(trends.peak_hour, Some(18));
        assert_eq!(trends.peak_weekday, Some(Weekday::Fri));
        assert_eq!(trends.peak_month, Some(3));

        let empty = engine.seasonal_trends(&[]);
        assert_eq!(empty.peak_hour, None);
    }

    #[test]
    fn test_insights_cover_configured_horizons() {
        let engine = ForecastEngine::default();
        let now = Utc::now();
        let mut agg = MetricAggregate::new(AggregateKey::new("costly", None), "b", now);
        agg.apply(Channel::Google, MetricName::Cost, 100.0, Metadata::new(), now);
        agg.apply(Channel::Google, MetricName::Revenue, 40.0, Metadata::new(), now);

        let insights = engine.insights(&[agg]);
        let horizons: Vec<u32> = insights.forecasts.iter().map(|f| f.horizon_days).collect();
        assert_eq!(horizons, vec![30, 90]);
        assert_eq!(insights.forecasts[0].estimated_cost, 3_000);
        assert_eq!(insights.underperforming_assets, vec!["costly"]);
    }
}
