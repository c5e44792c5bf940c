use crate::error::{InsightsError, InsightsResult};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Root engine configuration. Loaded from an optional TOML config file and
/// environment variables with prefix `DESIGN_INSIGHTS` and separator `__`
/// (e.g. `DESIGN_INSIGHTS__MONITOR__TREND_WINDOW_DAYS`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub attribution: AttributionConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub signals: SignalConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributionConfig {
    /// Days after which a touchpoint's time-decay weight halves.
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,
}

/// Alert thresholds and auto-optimization switches consumed by the monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_budget_utilization")]
    pub budget_utilization: f64,
    #[serde(default = "default_performance_drop")]
    pub performance_drop: f64,
    #[serde(default = "default_cost_increase")]
    pub cost_increase: f64,
    #[serde(default = "default_conversion_drop")]
    pub conversion_drop: f64,
    #[serde(default)]
    pub budget_reallocation: bool,
    #[serde(default)]
    pub pause_underperforming: bool,
    #[serde(default)]
    pub increase_top_performing: bool,
    /// Trailing days treated as "recent" for score and trend.
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: usize,
    /// Days preceding the recent window used as the baseline.
    #[serde(default = "default_baseline_window_days")]
    pub baseline_window_days: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Event-log entries retained per aggregate; older entries are trimmed.
    #[serde(default = "default_max_events")]
    pub max_events_per_aggregate: usize,
    #[serde(default = "default_query_days")]
    pub default_query_days: u32,
    /// Events and touchpoints timestamped further than this from now, in
    /// either direction, are rejected.
    #[serde(default = "default_max_timestamp_skew_days")]
    pub max_timestamp_skew_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_signal_limit")]
    pub default_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_horizons")]
    pub horizons: Vec<u32>,
    /// History considered by predictive insights.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

// Default functions
fn default_half_life_days() -> f64 {
    7.0
}
fn default_budget_utilization() -> f64 {
    0.8
}
fn default_performance_drop() -> f64 {
    0.2
}
fn default_cost_increase() -> f64 {
    0.3
}
fn default_conversion_drop() -> f64 {
    0.25
}
fn default_trend_window_days() -> usize {
    7
}
fn default_baseline_window_days() -> usize {
    28
}
fn default_max_events() -> usize {
    10_000
}
fn default_query_days() -> u32 {
    30
}
fn default_max_timestamp_skew_days() -> u32 {
    730
}
fn default_signal_limit() -> usize {
    5
}
fn default_horizons() -> Vec<u32> {
    vec![30, 90]
}
fn default_lookback_days() -> u32 {
    90
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            half_life_days: default_half_life_days(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            budget_utilization: default_budget_utilization(),
            performance_drop: default_performance_drop(),
            cost_increase: default_cost_increase(),
            conversion_drop: default_conversion_drop(),
            budget_reallocation: false,
            pause_underperforming: false,
            increase_top_performing: false,
            trend_window_days: default_trend_window_days(),
            baseline_window_days: default_baseline_window_days(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_events_per_aggregate: default_max_events(),
            default_query_days: default_query_days(),
            max_timestamp_skew_days: default_max_timestamp_skew_days(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_signal_limit(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizons: default_horizons(),
            lookback_days: default_lookback_days(),
        }
    }
}

impl MonitorConfig {
    /// True when any declining-trend reaction is switched on.
    pub fn reacts_to_decline(&self) -> bool {
        self.budget_reallocation || self.pause_underperforming
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file overlaid by environment
    /// variables. A missing file is not an error.
    pub fn load_from(path: Option<&Path>) -> InsightsResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("DESIGN_INSIGHTS")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("forecast.horizons"),
            )
            .build()
            .map_err(|e| InsightsError::Config(e.to_string()))?;
        debug!(file = ?path, "Configuration sources loaded");
        config
            .try_deserialize()
            .map_err(|e| InsightsError::Config(e.to_string()))
    }
}
