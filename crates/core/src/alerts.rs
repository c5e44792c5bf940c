//! Monitor outcomes and the hook the metric store uses to hand freshly
//! updated aggregates to the monitor.

use crate::error::InsightsResult;
use crate::types::{AggregateKey, MetricAggregate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    /// Performance score fell below the alerting floor.
    LowPerformance,
    CostIncrease,
    ConversionDrop,
    /// Registered budget consumed past the utilization threshold.
    BudgetUtilization,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub key: AggregateKey,
    pub kind: AlertKind,
    pub threshold: f64,
    pub observed: f64,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged: bool,
}

/// Auto-optimization request for the external budget manager. Emitting one
/// never changes spend by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    PauseUnderperforming,
    ReallocateBudget,
    IncreaseBudget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationAction {
    pub key: AggregateKey,
    pub kind: ActionKind,
    pub reason: String,
}

/// Result of evaluating one aggregate against the monitor thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub trend: Trend,
    pub alerts: Vec<Alert>,
    pub actions: Vec<OptimizationAction>,
}

impl Evaluation {
    /// Neutral outcome used when there is nothing to judge.
    pub fn neutral() -> Self {
        Self {
            score: 0.5,
            trend: Trend::Stable,
            alerts: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.alerts.is_empty() && self.actions.is_empty()
    }
}

/// Invoked synchronously by the metric store after every successful write.
pub trait RecordObserver: Send + Sync {
    fn on_recorded(&self, aggregate: &MetricAggregate) -> InsightsResult<Evaluation>;
}
