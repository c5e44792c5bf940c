use chrono::{DateTime, Utc};
use insights_core::config::SignalConfig;
use insights_core::decay::{age_in_days, linear_recency_boost};
use insights_core::{InsightsError, InsightsResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Points available from text length, one per 20 words.
const MAX_LENGTH_POINTS: f64 = 2.0;
const WORDS_PER_POINT: f64 = 20.0;
/// Points available from recency, one lost every 30 days.
const MAX_RECENCY_POINTS: f64 = 5.0;
const DAYS_PER_RECENCY_POINT: f64 = 30.0;

/// A textual signal such as a customer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Star rating, 1 to 5.
    pub rating: u8,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(rating: u8, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            rating,
            text: text.into(),
            timestamp,
        }
    }

    fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSignal {
    #[serde(flatten)]
    pub signal: Signal,
    pub score: f64,
    pub highlighted: bool,
}

pub struct SignalRanker {
    default_limit: usize,
}

impl SignalRanker {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            default_limit: config.default_limit,
        }
    }

    /// `rating + length points + recency points`.
    pub fn score(signal: &Signal, now: DateTime<Utc>) -> f64 {
        let length = (signal.word_count() as f64 / WORDS_PER_POINT).min(MAX_LENGTH_POINTS);
        let recency = linear_recency_boost(
            age_in_days(signal.timestamp, now),
            MAX_RECENCY_POINTS,
            DAYS_PER_RECENCY_POINT,
        );
        f64::from(signal.rating) + length + recency
    }

    /// Rank against the current time. `None` uses the configured limit.
    pub fn rank(&self, signals: &[Signal], limit: Option<usize>) -> InsightsResult<Vec<RankedSignal>> {
        self.rank_at(signals, limit, Utc::now())
    }

    /// Highest scores first; equal scores keep their input order. Only the
    /// top `limit` are returned, all highlighted.
    pub fn rank_at(
        &self,
        signals: &[Signal],
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> InsightsResult<Vec<RankedSignal>> {
        if let Some(bad) = signals.iter().find(|s| !(1..=5).contains(&s.rating)) {
            return Err(InsightsError::invalid(format!(
                "rating must be between 1 and 5, got {}",
                bad.rating
            )));
        }

        let limit = limit.unwrap_or(self.default_limit);
        let mut scored: Vec<RankedSignal> = signals
            .iter()
            .map(|s| RankedSignal {
                score: Self::score(s, now),
                signal: s.clone(),
                highlighted: true,
            })
            .collect();
        // `sort_by` is stable, so ties stay in input order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);

        debug!(
            candidates = signals.len(),
            selected = scored.len(),
            "Signals ranked"
        );
        Ok(scored)
    }
}

impl Default for SignalRanker {
    fn default() -> Self {
        Self::new(&SignalConfig::default())
    }
}
