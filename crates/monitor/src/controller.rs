use crate::scoring::{classify_trend, daily_mean, performance_score};
use chrono::Utc;
use dashmap::DashMap;
use insights_core::config::MonitorConfig;
use insights_core::{
    ActionKind, AggregateKey, Alert, AlertKind, DailySeries, Evaluation, InsightsResult,
    MetricAggregate, MetricName, OptimizationAction, RecordObserver, Trend,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Score below which a low-performance alert fires.
const LOW_PERFORMANCE_FLOOR: f64 = 0.3;

/// Oldest alerts are dropped past this many per aggregate.
const MAX_ALERTS_PER_KEY: usize = 100;

// ---------------------------------------------------------------------------
// MonitorController
// ---------------------------------------------------------------------------

/// Evaluates aggregates after every write and keeps an alert history.
pub struct MonitorController {
    config: MonitorConfig,
    /// aggregate -> registered budget
    budgets: DashMap<AggregateKey, f64>,
    /// aggregate -> alerts raised so far
    alerts: DashMap<AggregateKey, Vec<Alert>>,
}

impl MonitorController {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            budgets: DashMap::new(),
            alerts: DashMap::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Register the total budget of an aggregate for utilization alerts.
    /// Non-positive budgets clear the registration.
    pub fn set_budget(&self, key: AggregateKey, budget: f64) {
        if budget.is_finite() && budget > 0.0 {
            self.budgets.insert(key, budget);
        } else {
            self.budgets.remove(&key);
        }
    }

    pub fn budget(&self, key: &AggregateKey) -> Option<f64> {
        self.budgets.get(key).map(|b| *b)
    }

    /// Score an aggregate against `thresholds`. Never fails: an aggregate
    /// without any history evaluates to a neutral, quiet result.
    pub fn evaluate(&self, aggregate: &MetricAggregate, thresholds: &MonitorConfig) -> Evaluation {
        let key = aggregate.key();
        let series = DailySeries::from_aggregates([aggregate]);
        if series.totals().is_zero() && aggregate.counters.is_zero() {
            return Evaluation::neutral();
        }

        let score = performance_score(&series, thresholds);
        let trend = classify_trend(&series, thresholds);
        let alerts = self.check_thresholds(&key, aggregate, &series, score, thresholds);
        let actions = optimization_actions(&key, trend, thresholds);

        Evaluation {
            score,
            trend,
            alerts,
            actions,
        }
    }

    fn check_thresholds(
        &self,
        key: &AggregateKey,
        aggregate: &MetricAggregate,
        series: &DailySeries,
        score: f64,
        thresholds: &MonitorConfig,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if score < LOW_PERFORMANCE_FLOOR {
            alerts.push(new_alert(
                key,
                AlertKind::LowPerformance,
                LOW_PERFORMANCE_FLOOR,
                score,
                format!("{} performance score {:.2} is below {:.2}", key, score, LOW_PERFORMANCE_FLOOR),
            ));
        }

        let (baseline, recent) =
            series.split_recent(thresholds.trend_window_days, thresholds.baseline_window_days);

        let baseline_cost = daily_mean(baseline, MetricName::Cost);
        if baseline_cost > 0.0 {
            let increase = (daily_mean(recent, MetricName::Cost) - baseline_cost) / baseline_cost;
            if increase > thresholds.cost_increase {
                alerts.push(new_alert(
                    key,
                    AlertKind::CostIncrease,
                    thresholds.cost_increase,
                    increase,
                    format!("{} daily cost up {:.1}% against baseline", key, increase * 100.0),
                ));
            }
        }

        let baseline_conversions = daily_mean(baseline, MetricName::Conversions);
        if baseline_conversions > 0.0 {
            let drop = (baseline_conversions - daily_mean(recent, MetricName::Conversions))
                / baseline_conversions;
            if drop > thresholds.conversion_drop {
                alerts.push(new_alert(
                    key,
                    AlertKind::ConversionDrop,
                    thresholds.conversion_drop,
                    drop,
                    format!("{} daily conversions down {:.1}% against baseline", key, drop * 100.0),
                ));
            }
        }

        if let Some(budget) = self.budget(key) {
            let utilization = aggregate.metric(MetricName::Cost) / budget;
            if utilization >= thresholds.budget_utilization {
                alerts.push(new_alert(
                    key,
                    AlertKind::BudgetUtilization,
                    thresholds.budget_utilization,
                    utilization,
                    format!("{} has used {:.1}% of its budget", key, utilization * 100.0),
                ));
            }
        }

        alerts
    }

    /// Append alerts to the history. An alert is skipped while an
    /// unacknowledged alert of the same kind is still open for the key.
    fn remember(&self, key: &AggregateKey, alerts: &[Alert]) {
        if alerts.is_empty() {
            return;
        }
        let mut history = self.alerts.entry(key.clone()).or_default();
        for alert in alerts {
            let open = history
                .iter()
                .any(|a| a.kind == alert.kind && !a.acknowledged);
            if open {
                continue;
            }
            warn!(key = %key, kind = ?alert.kind, observed = alert.observed, "{}", alert.message);
            metrics::counter!("insights.monitor.alerts").increment(1);
            history.push(alert.clone());
        }
        if history.len() > MAX_ALERTS_PER_KEY {
            let excess = history.len() - MAX_ALERTS_PER_KEY;
            history.drain(..excess);
        }
    }

    /// Return all alerts raised for an aggregate, oldest first.
    pub fn get_alerts(&self, key: &AggregateKey) -> Vec<Alert> {
        self.alerts.get(key).map(|r| r.clone()).unwrap_or_default()
    }

    /// Alerts across all aggregates that nobody has acknowledged yet.
    pub fn open_alerts(&self) -> Vec<Alert> {
        let mut open: Vec<Alert> = self
            .alerts
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|a| !a.acknowledged)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        open.sort_by(|a, b| a.triggered_at.cmp(&b.triggered_at).then_with(|| a.key.cmp(&b.key)));
        open
    }

    /// Mark an alert as seen. Returns `true` if found.
    pub fn acknowledge_alert(&self, alert_id: &Uuid) -> bool {
        for mut entry in self.alerts.iter_mut() {
            for alert in entry.value_mut().iter_mut() {
                if alert.id == *alert_id {
                    alert.acknowledged = true;
                    return true;
                }
            }
        }
        false
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl RecordObserver for MonitorController {
    fn on_recorded(&self, aggregate: &MetricAggregate) -> InsightsResult<Evaluation> {
        let evaluation = self.evaluate(aggregate, &self.config);
        let key = aggregate.key();
        self.remember(&key, &evaluation.alerts);

        for action in &evaluation.actions {
            debug!(key = %key, kind = ?action.kind, "Optimization action requested");
            metrics::counter!("insights.monitor.actions").increment(1);
        }

        Ok(evaluation)
    }
}

fn new_alert(
    key: &AggregateKey,
    kind: AlertKind,
    threshold: f64,
    observed: f64,
    message: String,
) -> Alert {
    Alert {
        id: Uuid::new_v4(),
        key: key.clone(),
        kind,
        threshold,
        observed,
        message,
        triggered_at: Utc::now(),
        acknowledged: false,
    }
}

/// Requests for the budget manager, gated by the auto-optimization flags.
fn optimization_actions(
    key: &AggregateKey,
    trend: Trend,
    thresholds: &MonitorConfig,
) -> Vec<OptimizationAction> {
    let mut actions = Vec::new();
    match trend {
        Trend::Declining => {
            if !thresholds.reacts_to_decline() {
                debug!(key = %key, "Declining trend with auto-optimization off");
            }
            if thresholds.pause_underperforming {
                actions.push(OptimizationAction {
                    key: key.clone(),
                    kind: ActionKind::PauseUnderperforming,
                    reason: "conversions declining over the trend window".into(),
                });
            }
            if thresholds.budget_reallocation {
                actions.push(OptimizationAction {
                    key: key.clone(),
                    kind: ActionKind::ReallocateBudget,
                    reason: "shift spend away from a declining design".into(),
                });
            }
        }
        Trend::Improving => {
            if thresholds.increase_top_performing {
                actions.push(OptimizationAction {
                    key: key.clone(),
                    kind: ActionKind::IncreaseBudget,
                    reason: "conversions improving over the trend window".into(),
                });
            }
        }
        Trend::Stable => {}
    }
    actions
}
