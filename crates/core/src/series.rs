//! Per-day totals reconstructed from aggregate event logs.

use crate::types::{MetricAggregate, MetricCounters, MetricName};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub totals: MetricCounters,
}

/// Contiguous run of UTC calendar days from the first to the last observed
/// day. Days without events are present with zero totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    days: Vec<DailyTotals>,
}

impl DailySeries {
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, MetricName, f64)>,
    {
        let mut buckets: BTreeMap<NaiveDate, MetricCounters> = BTreeMap::new();
        for (date, metric, value) in points {
            buckets.entry(date).or_default().add(metric, value);
        }

        let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Self::default(),
        };

        let mut days = Vec::new();
        let mut date = first;
        while date <= last {
            days.push(DailyTotals {
                date,
                totals: buckets.remove(&date).unwrap_or_default(),
            });
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        Self { days }
    }

    pub fn from_aggregates<'a, I>(aggregates: I) -> Self
    where
        I: IntoIterator<Item = &'a MetricAggregate>,
    {
        Self::from_points(aggregates.into_iter().flat_map(|agg| {
            agg.events
                .iter()
                .map(|e| (e.timestamp.date_naive(), e.name, e.value))
        }))
    }

    /// Days on or after `cutoff`.
    pub fn since(&self, cutoff: NaiveDate) -> Self {
        Self {
            days: self
                .days
                .iter()
                .filter(|d| d.date >= cutoff)
                .cloned()
                .collect(),
        }
    }

    pub fn days(&self) -> &[DailyTotals] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn totals(&self) -> MetricCounters {
        let mut totals = MetricCounters::new();
        for day in &self.days {
            totals.merge(&day.totals);
        }
        totals
    }

    pub fn values(&self, metric: MetricName) -> Vec<f64> {
        self.days.iter().map(|d| d.totals.get(metric)).collect()
    }

    /// Split off the last `recent` days and up to `baseline` days before them.
    /// Returns `(baseline, recent)`.
    pub fn split_recent(&self, recent: usize, baseline: usize) -> (&[DailyTotals], &[DailyTotals]) {
        let recent_start = self.days.len().saturating_sub(recent);
        let baseline_start = recent_start.saturating_sub(baseline);
        (
            &self.days[baseline_start..recent_start],
            &self.days[recent_start..],
        )
    }
}
