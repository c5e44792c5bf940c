//! End-to-end flow: events recorded through the store, evaluated by the
//! monitor, then reported on by the attribution, ROI and forecast engines.

use chrono::{Duration, Utc};
use insights_core::config::{AttributionConfig, ForecastConfig, MonitorConfig, StoreConfig};
use insights_core::{AggregateKey, AlertKind, Channel, InteractionType};
use insights_monitor::MonitorController;
use insights_reporting::{
    AttributionModel, AttributionModeler, ConfidenceLevel, ForecastEngine, RoiEngine,
};
use insights_store::{MetricStore, RecordRequest};
use std::sync::Arc;

fn wired() -> (MetricStore, Arc<MonitorController>) {
    let monitor = Arc::new(MonitorController::new(MonitorConfig::default()));
    let store = MetricStore::in_memory(StoreConfig::default()).with_observer(monitor.clone());
    (store, monitor)
}

fn record(store: &MetricStore, business: &str, design: &str, channel: &str, event: &str, value: f64) {
    store
        .record(&RecordRequest::new(business, design, channel, event).value(value))
        .unwrap();
}

#[test]
fn test_recorded_events_flow_into_reports() -> anyhow::Result<()> {
    let (store, _monitor) = wired();

    record(&store, "b1", "flyer", "facebook", "impressions", 1_000.0);
    record(&store, "b1", "flyer", "facebook", "clicks", 50.0);
    record(&store, "b1", "flyer", "google", "conversions", 5.0);
    record(&store, "b1", "flyer", "facebook", "cost", 100.0);
    record(&store, "b1", "flyer", "google", "revenue", 400.0);
    record(&store, "b2", "other", "email", "clicks", 7.0);

    let key = AggregateKey::new("flyer", None);
    let now = Utc::now();
    store.append_touchpoint(&key, "b1", "facebook", InteractionType::View, now - Duration::days(3))?;
    store.append_touchpoint(&key, "b1", "email", InteractionType::Click, now - Duration::days(1))?;
    store.append_touchpoint(&key, "b1", "google", InteractionType::Conversion, now)?;

    let aggregates = store.query("b1", 30)?;
    assert_eq!(aggregates.len(), 1);

    let roi = RoiEngine::new().compute_roi(&aggregates);
    assert_eq!(roi.roi, 300.0);
    assert_eq!(roi.roas, 4.0);

    let attribution = AttributionModeler::new(&AttributionConfig::default()).attribute(&aggregates);
    assert_eq!(attribution.credit(AttributionModel::FirstTouch, Channel::Facebook), 1.0);
    assert_eq!(attribution.credit(AttributionModel::LastTouch, Channel::Google), 1.0);
    let linear_email = attribution.credit(AttributionModel::Linear, Channel::Email);
    assert!((linear_email - 1.0 / 3.0).abs() < 1e-9);

    let forecast = ForecastEngine::new(ForecastConfig::default()).forecast(&aggregates, 30);
    assert_eq!(forecast.history_days, 1);
    assert_eq!(forecast.estimated_impressions, 30_000);
    assert_eq!(forecast.confidence_level, ConfidenceLevel::Low);
    Ok(())
}

#[test]
fn test_monitor_alerts_surface_through_record() -> anyhow::Result<()> {
    let (store, monitor) = wired();
    let key = AggregateKey::new("poster", Some("spring".into()));
    monitor.set_budget(key.clone(), 100.0);

    let request = RecordRequest::new("b1", "poster", "instagram", "cost")
        .campaign("spring")
        .value(85.0);
    let outcome = store.record(&request)?;

    let evaluation = outcome.evaluation.expect("monitor attached");
    assert!(outcome.monitor_warning.is_none());
    assert!(evaluation
        .alerts
        .iter()
        .any(|a| a.kind == AlertKind::BudgetUtilization));

    let history = monitor.get_alerts(&key);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].key, key);
    Ok(())
}

#[test]
fn test_rejected_event_reaches_no_report() -> anyhow::Result<()> {
    let (store, monitor) = wired();
    let bad = RecordRequest::new("b1", "flyer", "carrier-pigeon", "clicks");
    assert!(store.record(&bad).is_err());

    assert!(store.query("b1", 30)?.is_empty());
    assert!(monitor.open_alerts().is_empty());
    Ok(())
}
