//! Performance reporting: multi-touch attribution, ROI grading,
//! forecasting and industry benchmarking over metric aggregates.

pub mod attribution;
pub mod benchmarks;
pub mod forecast;
pub mod roi;

pub use attribution::{AttributionModel, AttributionModeler, AttributionReport};
pub use benchmarks::{BenchmarkComparison, Industry, IndustryBenchmark};
pub use forecast::{ConfidenceLevel, ForecastEngine, ForecastResult, PredictiveInsights};
pub use roi::{PerformanceGrade, Recommendation, RoiEngine, RoiReport};
