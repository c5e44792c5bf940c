//! Live monitoring: scores each freshly updated aggregate, raises threshold
//! alerts and emits auto-optimization requests.

pub mod controller;
pub mod scoring;

pub use controller::MonitorController;
pub use scoring::{classify_trend, performance_score};
