//! Multi-touch attribution: splits conversion credit among the channels on
//! each design's conversion path.

use chrono::{DateTime, Utc};
use insights_core::config::AttributionConfig;
use insights_core::decay::{age_in_days, half_life_weight};
use insights_core::{Channel, MetricAggregate, Touchpoint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributionModel {
    FirstTouch,
    LastTouch,
    Linear,
    TimeDecay,
    PositionBased,
}

impl AttributionModel {
    pub const ALL: [AttributionModel; 5] = [
        AttributionModel::FirstTouch,
        AttributionModel::LastTouch,
        AttributionModel::Linear,
        AttributionModel::TimeDecay,
        AttributionModel::PositionBased,
    ];
}

/// Credited conversions per channel under one model.
pub type ChannelCredit = BTreeMap<Channel, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRanking {
    pub channel: Channel,
    pub credit: f64,
}

/// A distinct ordered channel sequence and how many paths followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionPath {
    pub channels: Vec<Channel>,
    pub occurrences: u64,
}

/// Two channels that appeared together on the same conversion path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSynergy {
    pub channels: (Channel, Channel),
    pub shared_paths: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionReport {
    pub models: BTreeMap<AttributionModel, ChannelCredit>,
    pub best_performing_channels: Vec<ChannelRanking>,
    pub conversion_paths: Vec<ConversionPath>,
    pub channel_synergy: Vec<ChannelSynergy>,
    pub paths_analyzed: u64,
    pub computed_at: DateTime<Utc>,
}

impl AttributionReport {
    pub fn credit(&self, model: AttributionModel, channel: Channel) -> f64 {
        self.models
            .get(&model)
            .and_then(|m| m.get(&channel))
            .copied()
            .unwrap_or(0.0)
    }
}

pub struct AttributionModeler {
    half_life_days: f64,
}

impl AttributionModeler {
    pub fn new(config: &AttributionConfig) -> Self {
        Self::with_half_life(config.half_life_days)
    }

    pub fn with_half_life(half_life_days: f64) -> Self {
        Self { half_life_days }
    }

    /// Per-touchpoint credit for one path under `model`. Credits sum to 1 for
    /// any non-empty path; an empty path yields nothing.
    pub fn path_credit(&self, model: AttributionModel, path: &[Touchpoint]) -> Vec<(Channel, f64)> {
        let n = path.len();
        if n == 0 {
            return Vec::new();
        }

        let weights: Vec<f64> = match model {
            AttributionModel::FirstTouch => (0..n).map(|i| if i == 0 { 1.0 } else { 0.0 }).collect(),
            AttributionModel::LastTouch => {
                (0..n).map(|i| if i == n - 1 { 1.0 } else { 0.0 }).collect()
            }
            AttributionModel::Linear => vec![1.0 / n as f64; n],
            AttributionModel::TimeDecay => {
                let conversion_at = path[n - 1].timestamp;
                let raw: Vec<f64> = path
                    .iter()
                    .map(|t| half_life_weight(age_in_days(t.timestamp, conversion_at), self.half_life_days))
                    .collect();
                let total: f64 = raw.iter().sum();
                if total > 0.0 {
                    raw.into_iter().map(|w| w / total).collect()
                } else {
                    vec![1.0 / n as f64; n]
                }
            }
            AttributionModel::PositionBased => match n {
                1 => vec![1.0],
                // No interior: the endpoints split everything.
                2 => vec![0.5, 0.5],
                _ => {
                    let interior = 0.2 / (n - 2) as f64;
                    (0..n)
                        .map(|i| if i == 0 || i == n - 1 { 0.4 } else { interior })
                        .collect()
                }
            },
        };

        path.iter().map(|t| t.channel).zip(weights).collect()
    }

    /// Attribute every non-empty conversion path among `aggregates` under all
    /// five models and sum the credit per channel.
    pub fn attribute(&self, aggregates: &[MetricAggregate]) -> AttributionReport {
        let mut models: BTreeMap<AttributionModel, ChannelCredit> = AttributionModel::ALL
            .iter()
            .map(|m| (*m, ChannelCredit::new()))
            .collect();
        let mut path_counts: HashMap<Vec<Channel>, u64> = HashMap::new();
        let mut synergy: BTreeMap<(Channel, Channel), u64> = BTreeMap::new();
        let mut paths_analyzed = 0u64;

        for aggregate in aggregates {
            if aggregate.touchpoints.is_empty() {
                continue;
            }
            let mut path = aggregate.touchpoints.clone();
            path.sort_by_key(|t| t.timestamp);
            paths_analyzed += 1;

            for model in AttributionModel::ALL {
                let credit = models.entry(model).or_default();
                for (channel, share) in self.path_credit(model, &path) {
                    *credit.entry(channel).or_insert(0.0) += share;
                }
            }

            let sequence: Vec<Channel> = path.iter().map(|t| t.channel).collect();
            let distinct: BTreeSet<Channel> = sequence.iter().copied().collect();
            *path_counts.entry(sequence).or_insert(0) += 1;

            let distinct: Vec<Channel> = distinct.into_iter().collect();
            for (i, a) in distinct.iter().enumerate() {
                for b in &distinct[i + 1..] {
                    *synergy.entry(ordered_pair(*a, *b)).or_insert(0) += 1;
                }
            }
        }

        let best_performing_channels = rank_channels(&models[&AttributionModel::Linear]);

        let mut conversion_paths: Vec<ConversionPath> = path_counts
            .into_iter()
            .map(|(channels, occurrences)| ConversionPath {
                channels,
                occurrences,
            })
            .collect();
        conversion_paths.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then_with(|| channel_names(&a.channels).cmp(&channel_names(&b.channels)))
        });

        let mut channel_synergy: Vec<ChannelSynergy> = synergy
            .into_iter()
            .map(|(channels, shared_paths)| ChannelSynergy {
                channels,
                shared_paths,
            })
            .collect();
        channel_synergy.sort_by(|a, b| {
            b.shared_paths.cmp(&a.shared_paths).then_with(|| {
                (a.channels.0.as_str(), a.channels.1.as_str())
                    .cmp(&(b.channels.0.as_str(), b.channels.1.as_str()))
            })
        });

        debug!(
            aggregates = aggregates.len(),
            paths = paths_analyzed,
            "Attribution computed"
        );

        AttributionReport {
            models,
            best_performing_channels,
            conversion_paths,
            channel_synergy,
            paths_analyzed,
            computed_at: Utc::now(),
        }
    }
}

impl Default for AttributionModeler {
    fn default() -> Self {
        Self::new(&AttributionConfig::default())
    }
}

fn ordered_pair(a: Channel, b: Channel) -> (Channel, Channel) {
    if a.as_str() <= b.as_str() {
        (a, b)
    } else {
        (b, a)
    }
}

fn channel_names(channels: &[Channel]) -> Vec<&'static str> {
    channels.iter().map(|c| c.as_str()).collect()
}

/// Channels by credit descending, ties alphabetical.
fn rank_channels(credit: &ChannelCredit) -> Vec<ChannelRanking> {
    let mut ranked: Vec<ChannelRanking> = credit
        .iter()
        .map(|(channel, credit)| ChannelRanking {
            channel: *channel,
            credit: *credit,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.credit
            .partial_cmp(&a.credit)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.channel.as_str().cmp(b.channel.as_str()))
    });
    ranked
}
