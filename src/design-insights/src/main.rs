//! Design Insights: marketing analytics over recorded design engagement.
//!
//! Replays a JSON-lines event file through the metric store (with the
//! monitor attached), then prints attribution, ROI, forecast, benchmark and
//! testimonial reports for one business as JSON.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::Parser;
use insights_core::{AggregateKey, Alert, AppConfig, InsightsError, InteractionType};
use insights_monitor::MonitorController;
use insights_reporting::{
    AttributionModeler, AttributionReport, BenchmarkComparison, ForecastEngine, ForecastResult,
    Industry, PredictiveInsights, RoiEngine, RoiReport,
};
use insights_signals::{analyze_sentiment, RankedSignal, SentimentReport, Signal, SignalRanker};
use insights_store::{MetricStore, RecordRequest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "design-insights")]
#[command(about = "Attribution, ROI and forecasting for marketing designs")]
#[command(version)]
struct Cli {
    /// Optional TOML config file (environment overrides still apply)
    #[arg(long, env = "DESIGN_INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-lines file of engagement events to replay
    #[arg(long)]
    events: PathBuf,

    /// Business to report on
    #[arg(long)]
    business: String,

    /// Industry used for benchmark comparison
    #[arg(long, default_value = "retail")]
    industry: String,

    /// Forecast horizon in days
    #[arg(long, default_value_t = 30)]
    horizon: u32,

    /// Trailing window for the report (overrides config)
    #[arg(long)]
    since_days: Option<u32>,

    /// JSON array of reviews to rank as testimonials
    #[arg(long)]
    reviews: Option<PathBuf>,

    /// Number of testimonials to keep (overrides config)
    #[arg(long)]
    limit: Option<usize>,

    /// Budget registration, `design[/campaign]=amount`; repeatable
    #[arg(long = "budget", value_parser = parse_budget)]
    budgets: Vec<(AggregateKey, f64)>,
}

/// One replayed event: a record request plus its original time and an
/// optional conversion-path interaction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventLine {
    #[serde(flatten)]
    request: RecordRequest,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    interaction: Option<InteractionType>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplaySummary {
    recorded: usize,
    rejected: usize,
    touchpoints: usize,
    monitor_warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Testimonial {
    #[serde(flatten)]
    ranked: RankedSignal,
    sentiment: SentimentReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsightsReport {
    business_id: String,
    replay: ReplaySummary,
    roi: RoiReport,
    attribution: AttributionReport,
    forecast: ForecastResult,
    predictive: PredictiveInsights,
    benchmarks: BenchmarkComparison,
    open_alerts: Vec<Alert>,
    testimonials: Vec<Testimonial>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "design_insights=info,insights_store=info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Design Insights starting up");

    let mut config = AppConfig::load_from(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(days) = cli.since_days {
        config.store.default_query_days = days;
    }
    if let Some(limit) = cli.limit {
        config.signals.default_limit = limit;
    }

    info!(
        half_life_days = config.attribution.half_life_days,
        query_days = config.store.default_query_days,
        trend_window_days = config.monitor.trend_window_days,
        "Configuration loaded"
    );

    let monitor = Arc::new(MonitorController::new(config.monitor.clone()));
    for (key, amount) in &cli.budgets {
        monitor.set_budget(key.clone(), *amount);
    }
    let store = MetricStore::in_memory(config.store.clone()).with_observer(monitor.clone());

    let replay = replay_events(&store, &cli.events)?;
    info!(
        recorded = replay.recorded,
        rejected = replay.rejected,
        touchpoints = replay.touchpoints,
        "Event replay complete"
    );

    let aggregates = store
        .query_default(&cli.business)
        .context("querying aggregates")?;
    if aggregates.is_empty() {
        warn!(business_id = %cli.business, "No aggregates in the reporting window");
    }

    let forecasts = ForecastEngine::new(config.forecast.clone());
    let testimonials = match &cli.reviews {
        Some(path) => rank_reviews(&SignalRanker::new(&config.signals), path)?,
        None => Vec::new(),
    };

    let report = InsightsReport {
        business_id: cli.business.clone(),
        replay,
        roi: RoiEngine::new().compute_roi(&aggregates),
        attribution: AttributionModeler::new(&config.attribution).attribute(&aggregates),
        forecast: forecasts.forecast(&aggregates, cli.horizon),
        predictive: forecasts.insights(&aggregates),
        benchmarks: BenchmarkComparison::compare(Industry::from_name(&cli.industry), &aggregates),
        open_alerts: monitor.open_alerts(),
        testimonials,
    };

    let out = serde_json::to_string_pretty(&report).context("serializing report")?;
    println!("{out}");
    Ok(())
}

fn replay_events(store: &MetricStore, path: &Path) -> anyhow::Result<ReplaySummary> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading events from {}", path.display()))?;

    let mut summary = ReplaySummary::default();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: EventLine = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: malformed event", path.display(), idx + 1))?;
        let at = event.timestamp.unwrap_or_else(Utc::now);

        match store.record_at(&event.request, at) {
            Ok(outcome) => {
                summary.recorded += 1;
                if let Some(warning) = outcome.monitor_warning {
                    summary.monitor_warnings.push(warning);
                }
            }
            Err(InsightsError::InvalidInput(reason)) => {
                summary.rejected += 1;
                warn!(line = idx + 1, reason = %reason, "Skipping invalid event");
                continue;
            }
            Err(e) => return Err(e).context(format!("recording line {}", idx + 1)),
        }

        if let Some(interaction) = event.interaction {
            store
                .append_touchpoint(
                    &event.request.key(),
                    &event.request.business_id,
                    &event.request.channel,
                    interaction,
                    at,
                )
                .with_context(|| format!("adding touchpoint for line {}", idx + 1))?;
            summary.touchpoints += 1;
        }
    }
    Ok(summary)
}

fn rank_reviews(ranker: &SignalRanker, path: &Path) -> anyhow::Result<Vec<Testimonial>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading reviews from {}", path.display()))?;
    let signals: Vec<Signal> = serde_json::from_str(&raw).context("parsing reviews")?;

    let ranked = ranker.rank(&signals, None).context("ranking reviews")?;
    Ok(ranked
        .into_iter()
        .map(|ranked| {
            let sentiment = analyze_sentiment(&ranked.signal.text);
            Testimonial { ranked, sentiment }
        })
        .collect())
}

fn parse_budget(raw: &str) -> anyhow::Result<(AggregateKey, f64)> {
    let Some((target, amount)) = raw.split_once('=') else {
        bail!("expected design[/campaign]=amount, got {raw:?}");
    };
    let amount: f64 = amount.trim().parse().context("budget amount")?;
    let key = match target.split_once('/') {
        Some((design, campaign)) => AggregateKey::new(design.trim(), Some(campaign.trim().to_string())),
        None => AggregateKey::new(target.trim(), None),
    };
    if key.design_id.is_empty() {
        bail!("budget needs a design id");
    }
    Ok((key, amount))
}
