//! Shared domain types, configuration and error taxonomy for the design
//! performance analytics engine.

pub mod alerts;
pub mod config;
pub mod decay;
pub mod error;
pub mod series;
pub mod types;

pub use alerts::{
    ActionKind, Alert, AlertKind, Evaluation, OptimizationAction, RecordObserver, Trend,
};
pub use config::AppConfig;
pub use error::{InsightsError, InsightsResult};
pub use series::{DailySeries, DailyTotals};
pub use types::{
    AggregateKey, Channel, EventEntry, InteractionType, Metadata, MetadataValue, MetricAggregate,
    MetricCounters, MetricName, TimeSeries, Touchpoint,
};
