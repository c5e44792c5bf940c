use crate::error::InsightsError;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Counter names tracked for every design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricName {
    Impressions,
    Clicks,
    Conversions,
    Revenue,
    Cost,
    Reach,
    Engagement,
    Shares,
    Saves,
    Leads,
    #[serde(alias = "phoneCallsGenerated")]
    PhoneCalls,
    StoreVisits,
    WebsiteTraffic,
}

impl MetricName {
    pub const ALL: [MetricName; 13] = [
        MetricName::Impressions,
        MetricName::Clicks,
        MetricName::Conversions,
        MetricName::Revenue,
        MetricName::Cost,
        MetricName::Reach,
        MetricName::Engagement,
        MetricName::Shares,
        MetricName::Saves,
        MetricName::Leads,
        MetricName::PhoneCalls,
        MetricName::StoreVisits,
        MetricName::WebsiteTraffic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Impressions => "impressions",
            Self::Clicks => "clicks",
            Self::Conversions => "conversions",
            Self::Revenue => "revenue",
            Self::Cost => "cost",
            Self::Reach => "reach",
            Self::Engagement => "engagement",
            Self::Shares => "shares",
            Self::Saves => "saves",
            Self::Leads => "leads",
            Self::PhoneCalls => "phoneCalls",
            Self::StoreVisits => "storeVisits",
            Self::WebsiteTraffic => "websiteTraffic",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "phoneCallsGenerated" {
            return Ok(Self::PhoneCalls);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| InsightsError::invalid(format!("unknown event name '{s}'")))
    }
}

/// Marketing channels a design can be distributed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Facebook,
    Instagram,
    Google,
    Linkedin,
    Twitter,
    Email,
    Print,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::Facebook,
        Channel::Instagram,
        Channel::Google,
        Channel::Linkedin,
        Channel::Twitter,
        Channel::Email,
        Channel::Print,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Google => "google",
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
            Self::Email => "email",
            Self::Print => "print",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| InsightsError::invalid(format!("unknown channel '{s}'")))
    }
}

/// Scalar value attached to an event as free-form diagnostic context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// Accumulating counter set. Missing metrics read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricCounters {
    values: BTreeMap<MetricName, f64>,
}

impl MetricCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: MetricName) -> f64 {
        self.values.get(&metric).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, metric: MetricName, value: f64) {
        *self.values.entry(metric).or_insert(0.0) += value;
    }

    pub fn merge(&mut self, other: &MetricCounters) {
        for (metric, value) in &other.values {
            self.add(*metric, *value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricName, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    pub fn is_zero(&self) -> bool {
        self.values.values().all(|v| *v == 0.0)
    }
}

impl FromIterator<(MetricName, f64)> for MetricCounters {
    fn from_iter<I: IntoIterator<Item = (MetricName, f64)>>(iter: I) -> Self {
        let mut counters = Self::new();
        for (metric, value) in iter {
            counters.add(metric, value);
        }
        counters
    }
}

/// Running totals bucketed by hour of day, day of week (Sunday first) and
/// month of year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub hourly: [f64; 24],
    pub daily: [f64; 7],
    pub monthly: [f64; 12],
}

impl TimeSeries {
    pub fn add(&mut self, at: DateTime<Utc>, value: f64) {
        self.hourly[at.hour() as usize] += value;
        self.daily[at.weekday().num_days_from_sunday() as usize] += value;
        self.monthly[at.month0() as usize] += value;
    }

    pub fn merge(&mut self, other: &TimeSeries) {
        for (a, b) in self.hourly.iter_mut().zip(other.hourly.iter()) {
            *a += b;
        }
        for (a, b) in self.daily.iter_mut().zip(other.daily.iter()) {
            *a += b;
        }
        for (a, b) in self.monthly.iter_mut().zip(other.monthly.iter()) {
            *a += b;
        }
    }
}

/// One entry of the append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub name: MetricName,
    pub channel: Channel,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    View,
    Click,
    Conversion,
}

/// A timestamped interaction with one channel on a conversion path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Touchpoint {
    pub channel: Channel,
    pub timestamp: DateTime<Utc>,
    pub interaction_type: InteractionType,
}

/// Identity of an aggregate: one per (design, campaign) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregateKey {
    pub design_id: String,
    pub campaign_id: Option<String>,
}

impl AggregateKey {
    pub fn new(design_id: impl Into<String>, campaign_id: Option<String>) -> Self {
        Self {
            design_id: design_id.into(),
            campaign_id,
        }
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.campaign_id {
            Some(campaign) => write!(f, "{}/{}", self.design_id, campaign),
            None => write!(f, "{}/-", self.design_id),
        }
    }
}

/// Performance record for one design within one campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregate {
    pub design_id: String,
    pub campaign_id: Option<String>,
    pub business_id: String,
    pub counters: MetricCounters,
    pub per_channel: BTreeMap<Channel, MetricCounters>,
    pub time_series: TimeSeries,
    pub events: Vec<EventEntry>,
    pub touchpoints: Vec<Touchpoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetricAggregate {
    pub fn new(key: AggregateKey, business_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            design_id: key.design_id,
            campaign_id: key.campaign_id,
            business_id: business_id.into(),
            counters: MetricCounters::new(),
            per_channel: BTreeMap::new(),
            time_series: TimeSeries::default(),
            events: Vec::new(),
            touchpoints: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> AggregateKey {
        AggregateKey::new(self.design_id.clone(), self.campaign_id.clone())
    }

    pub fn metric(&self, metric: MetricName) -> f64 {
        self.counters.get(metric)
    }

    /// Add `value` to the top-level and channel counters, the time buckets and
    /// the event log in one step so the counter sets never drift apart.
    pub fn apply(
        &mut self,
        channel: Channel,
        metric: MetricName,
        value: f64,
        metadata: Metadata,
        at: DateTime<Utc>,
    ) {
        self.counters.add(metric, value);
        self.per_channel.entry(channel).or_default().add(metric, value);
        self.time_series.add(at, value);
        self.events.push(EventEntry {
            name: metric,
            channel,
            value,
            timestamp: at,
            metadata,
        });
        self.updated_at = self.updated_at.max(at);
    }

    /// Insert a touchpoint keeping timestamp order; equal timestamps keep
    /// insertion order.
    pub fn insert_touchpoint(&mut self, touchpoint: Touchpoint) {
        let idx = self
            .touchpoints
            .partition_point(|t| t.timestamp <= touchpoint.timestamp);
        self.touchpoints.insert(idx, touchpoint);
    }

    pub fn first_touch(&self) -> Option<Channel> {
        self.touchpoints.first().map(|t| t.channel)
    }

    pub fn last_touch(&self) -> Option<Channel> {
        self.touchpoints.last().map(|t| t.channel)
    }

    /// Drop the oldest log entries so at most `keep_last` remain. Counters are
    /// untouched. Returns the number of entries removed.
    pub fn trim_events(&mut self, keep_last: usize) -> usize {
        let excess = self.events.len().saturating_sub(keep_last);
        if excess > 0 {
            self.events.drain(..excess);
        }
        excess
    }

    pub fn channel_metric(&self, channel: Channel, metric: MetricName) -> f64 {
        self.per_channel
            .get(&channel)
            .map(|c| c.get(metric))
            .unwrap_or(0.0)
    }
}
