//! The metric store service: validates engagement events, applies them to
//! the backing aggregate atomically, then hands the result to the monitor.

use crate::backend::{AggregateBackend, InMemoryBackend};
use chrono::{DateTime, Duration, Utc};
use insights_core::config::StoreConfig;
use insights_core::{
    AggregateKey, Channel, Evaluation, InsightsError, InsightsResult, InteractionType, Metadata,
    MetricAggregate, MetricName, RecordObserver, Touchpoint,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An inbound engagement event as delivered by collaborators. Channel and
/// event names arrive as free text and are validated on record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    pub business_id: String,
    pub design_id: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    pub channel: String,
    pub event_name: String,
    /// Increment; `None` counts as one.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl RecordRequest {
    pub fn new(
        business_id: impl Into<String>,
        design_id: impl Into<String>,
        channel: impl Into<String>,
        event_name: impl Into<String>,
    ) -> Self {
        Self {
            business_id: business_id.into(),
            design_id: design_id.into(),
            campaign_id: None,
            channel: channel.into(),
            event_name: event_name.into(),
            value: None,
            metadata: Metadata::new(),
        }
    }

    pub fn campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn key(&self) -> AggregateKey {
        AggregateKey::new(self.design_id.clone(), self.campaign_id.clone())
    }
}

/// Outcome of a successful record. A monitor failure does not undo the
/// increment; it is reported through `monitor_warning`.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub aggregate: MetricAggregate,
    pub evaluation: Option<Evaluation>,
    pub monitor_warning: Option<String>,
}

struct ValidatedEvent {
    channel: Channel,
    metric: MetricName,
    value: f64,
}

pub struct MetricStore {
    backend: Arc<dyn AggregateBackend>,
    observer: Option<Arc<dyn RecordObserver>>,
    config: StoreConfig,
}

impl MetricStore {
    pub fn new(backend: Arc<dyn AggregateBackend>, config: StoreConfig) -> Self {
        info!(
            max_events = config.max_events_per_aggregate,
            "Metric store initialized"
        );
        Self {
            backend,
            observer: None,
            config,
        }
    }

    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(Arc::new(InMemoryBackend::new()), config)
    }

    /// Attach the component evaluated after every successful record.
    pub fn with_observer(mut self, observer: Arc<dyn RecordObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Record an event stamped with the current time.
    pub fn record(&self, request: &RecordRequest) -> InsightsResult<RecordOutcome> {
        self.record_at(request, Utc::now())
    }

    /// Record an event at an explicit time (replays and backfills).
    ///
    /// Replayed requests are counted again; no de-duplication happens here.
    pub fn record_at(
        &self,
        request: &RecordRequest,
        at: DateTime<Utc>,
    ) -> InsightsResult<RecordOutcome> {
        let checked = validate(request).and_then(|event| {
            self.check_timestamp(at)?;
            Ok(event)
        });
        let event = match checked {
            Ok(event) => event,
            Err(e) => {
                metrics::counter!("insights.events.rejected").increment(1);
                debug!(design_id = %request.design_id, error = %e, "Event rejected");
                return Err(e);
            }
        };

        let key = request.key();
        let max_events = self.config.max_events_per_aggregate;
        let mut metadata = Some(request.metadata.clone());
        let upserted = self.backend.upsert_with(
            &key,
            &request.business_id,
            at,
            &mut |agg: &mut MetricAggregate| {
                agg.apply(
                    event.channel,
                    event.metric,
                    event.value,
                    metadata.take().unwrap_or_default(),
                    at,
                );
                agg.trim_events(max_events);
            },
        );
        let aggregate = match upserted {
            Ok(aggregate) => aggregate,
            Err(e) => {
                if matches!(e, InsightsError::InvalidInput(_)) {
                    metrics::counter!("insights.events.rejected").increment(1);
                }
                debug!(key = %key, error = %e, "Event not applied");
                return Err(e);
            }
        };

        metrics::counter!("insights.events.recorded").increment(1);
        debug!(
            key = %key,
            channel = %event.channel,
            metric = %event.metric,
            value = event.value,
            "Event recorded"
        );

        let (evaluation, monitor_warning) = match &self.observer {
            Some(observer) => match observer.on_recorded(&aggregate) {
                Ok(evaluation) => (Some(evaluation), None),
                Err(e) => {
                    metrics::counter!("insights.monitor.observer_failures").increment(1);
                    warn!(key = %key, error = %e, "Monitor evaluation failed after record");
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        Ok(RecordOutcome {
            aggregate,
            evaluation,
            monitor_warning,
        })
    }

    /// Add a touchpoint to the conversion path of a (design, campaign) pair,
    /// creating the aggregate when needed.
    pub fn append_touchpoint(
        &self,
        key: &AggregateKey,
        business_id: &str,
        channel: &str,
        interaction_type: InteractionType,
        at: DateTime<Utc>,
    ) -> InsightsResult<MetricAggregate> {
        let channel: Channel = channel.parse()?;
        self.check_timestamp(at)?;
        let touchpoint = Touchpoint {
            channel,
            timestamp: at,
            interaction_type,
        };
        let mut pending = Some(touchpoint);
        self.backend
            .upsert_with(key, business_id, at, &mut |agg: &mut MetricAggregate| {
                if let Some(tp) = pending.take() {
                    agg.insert_touchpoint(tp);
                }
                agg.updated_at = agg.updated_at.max(at);
            })
    }

    /// Aggregates of `business_id` updated within the trailing `since_days`.
    pub fn query(&self, business_id: &str, since_days: u32) -> InsightsResult<Vec<MetricAggregate>> {
        let since = Utc::now() - Duration::days(i64::from(since_days));
        self.backend.scan_business(business_id, since)
    }

    /// `query` over the configured default window.
    pub fn query_default(&self, business_id: &str) -> InsightsResult<Vec<MetricAggregate>> {
        self.query(business_id, self.config.default_query_days)
    }

    pub fn get(&self, key: &AggregateKey) -> InsightsResult<Option<MetricAggregate>> {
        self.backend.get(key)
    }

    /// Reject timestamps more than `max_timestamp_skew_days` away from now.
    fn check_timestamp(&self, at: DateTime<Utc>) -> InsightsResult<()> {
        let now = Utc::now();
        let skew = Duration::days(i64::from(self.config.max_timestamp_skew_days));
        let too_old = now.checked_sub_signed(skew).is_some_and(|floor| at < floor);
        let too_new = now.checked_add_signed(skew).is_some_and(|ceiling| at > ceiling);
        if too_old || too_new {
            return Err(InsightsError::invalid(format!(
                "timestamp {} is more than {} days from now",
                at, self.config.max_timestamp_skew_days
            )));
        }
        Ok(())
    }

    /// Trim the event log of one aggregate. Unknown keys trim nothing.
    pub fn trim_events(&self, key: &AggregateKey, keep_last: usize) -> InsightsResult<usize> {
        let mut removed = 0;
        self.backend
            .update_existing(key, &mut |agg: &mut MetricAggregate| {
                removed = agg.trim_events(keep_last);
            })?;
        Ok(removed)
    }
}

fn validate(request: &RecordRequest) -> InsightsResult<ValidatedEvent> {
    if request.design_id.trim().is_empty() {
        return Err(InsightsError::invalid("design id must not be empty"));
    }
    if request.business_id.trim().is_empty() {
        return Err(InsightsError::invalid("business id must not be empty"));
    }
    let channel: Channel = request.channel.parse()?;
    let metric: MetricName = request.event_name.parse()?;
    let value = request.value.unwrap_or(1.0);
    if !value.is_finite() {
        return Err(InsightsError::invalid(format!(
            "value for '{metric}' must be finite"
        )));
    }
    if value < 0.0 {
        return Err(InsightsError::invalid(format!(
            "value for '{metric}' must not be negative, got {value}"
        )));
    }
    Ok(ValidatedEvent {
        channel,
        metric,
        value,
    })
}
