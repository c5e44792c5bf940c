//! Keyword-based sentiment for review text.

use serde::{Deserialize, Serialize};
use std::fmt;

const POSITIVE_WORDS: &[&str] = &[
    "great",
    "excellent",
    "amazing",
    "good",
    "best",
    "love",
    "perfect",
    "recommend",
    "fantastic",
    "awesome",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "poor",
    "terrible",
    "worst",
    "awful",
    "horrible",
    "disappointed",
    "waste",
    "avoid",
    "not",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "very positive")]
    VeryPositive,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "very negative")]
    VeryNegative,
}

impl Sentiment {
    pub fn from_score(score: f64) -> Self {
        if score > 0.5 {
            Self::VeryPositive
        } else if score > 0.0 {
            Self::Positive
        } else if score == 0.0 {
            Self::Neutral
        } else if score > -0.5 {
            Self::Negative
        } else {
            Self::VeryNegative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryPositive => "very positive",
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::VeryNegative => "very negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub sentiment: Sentiment,
    /// `(positive - negative) / (positive + negative + 1)`, in (-1, 1).
    pub score: f64,
    pub positive_count: usize,
    pub negative_count: usize,
}

pub fn analyze_sentiment(text: &str) -> SentimentReport {
    let mut positive_count = 0;
    let mut negative_count = 0;

    let lowered = text.to_lowercase();
    for word in lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
    {
        if POSITIVE_WORDS.contains(&word) {
            positive_count += 1;
        }
        if NEGATIVE_WORDS.contains(&word) {
            negative_count += 1;
        }
    }

    let score = (positive_count as f64 - negative_count as f64)
        / (positive_count + negative_count + 1) as f64;

    SentimentReport {
        sentiment: Sentiment::from_score(score),
        score,
        positive_count,
        negative_count,
    }
}
