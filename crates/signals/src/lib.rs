//! Supporting-evidence selection: ranks customer testimonials by quality,
//! detail and recency, and classifies their tone.

pub mod ranker;
pub mod sentiment;

pub use ranker::{RankedSignal, Signal, SignalRanker};
pub use sentiment::{analyze_sentiment, Sentiment, SentimentReport};
