//! Metric store: per (design, campaign) aggregates with atomic
//! increment-and-append, plus the trailing monitor hook.

pub mod backend;
pub mod service;

pub use backend::{AggregateBackend, InMemoryBackend};
pub use service::{MetricStore, RecordOutcome, RecordRequest};
