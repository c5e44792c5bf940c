//! Industry benchmarks and how a business's designs compare against them.

use insights_core::{MetricAggregate, MetricName};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Restaurant,
    Retail,
    Salon,
}

impl Industry {
    /// Unknown industries are benchmarked as retail.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "restaurant" => Self::Restaurant,
            "salon" => Self::Salon,
            _ => Self::Retail,
        }
    }

    pub fn benchmark(&self) -> IndustryBenchmark {
        match self {
            Self::Restaurant => IndustryBenchmark {
                avg_ctr: 0.025,
                avg_cpc: 1.2,
                avg_conversion_rate: 0.08,
                avg_roas: 3.2,
            },
            Self::Retail => IndustryBenchmark {
                avg_ctr: 0.018,
                avg_cpc: 0.95,
                avg_conversion_rate: 0.05,
                avg_roas: 2.8,
            },
            Self::Salon => IndustryBenchmark {
                avg_ctr: 0.032,
                avg_cpc: 1.5,
                avg_conversion_rate: 0.12,
                avg_roas: 4.1,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndustryBenchmark {
    pub avg_ctr: f64,
    pub avg_cpc: f64,
    pub avg_conversion_rate: f64,
    pub avg_roas: f64,
}

/// Actual rates next to the benchmark. `*_index` is actual / benchmark, so
/// values above 1.0 beat the industry (for CPC, below 1.0 is better).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub industry: Industry,
    pub benchmark: IndustryBenchmark,
    pub ctr: f64,
    pub cpc: f64,
    pub conversion_rate: f64,
    pub roas: f64,
    pub ctr_index: f64,
    pub cpc_index: f64,
    pub conversion_rate_index: f64,
    pub roas_index: f64,
    /// Dimensions where the business beats its industry.
    pub strengths: Vec<String>,
}

impl BenchmarkComparison {
    pub fn compare(industry: Industry, aggregates: &[MetricAggregate]) -> Self {
        let sum = |metric: MetricName| -> f64 { aggregates.iter().map(|a| a.metric(metric)).sum() };
        let impressions = sum(MetricName::Impressions);
        let clicks = sum(MetricName::Clicks);
        let conversions = sum(MetricName::Conversions);
        let cost = sum(MetricName::Cost);
        let revenue = sum(MetricName::Revenue);

        let ctr = ratio(clicks, impressions);
        let cpc = ratio(cost, clicks);
        let conversion_rate = ratio(conversions, clicks);
        let roas = ratio(revenue, cost);
        let benchmark = industry.benchmark();

        let mut comparison = Self {
            industry,
            benchmark,
            ctr,
            cpc,
            conversion_rate,
            roas,
            ctr_index: ratio(ctr, benchmark.avg_ctr),
            cpc_index: ratio(cpc, benchmark.avg_cpc),
            conversion_rate_index: ratio(conversion_rate, benchmark.avg_conversion_rate),
            roas_index: ratio(roas, benchmark.avg_roas),
            strengths: Vec::new(),
        };
        comparison.strengths = comparison.beaten_dimensions();
        comparison
    }

    fn beaten_dimensions(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.ctr_index > 1.0 {
            out.push("ctr".to_string());
        }
        // Lower CPC is better.
        if self.cpc > 0.0 && self.cpc_index < 1.0 {
            out.push("cpc".to_string());
        }
        if self.conversion_rate_index > 1.0 {
            out.push("conversion_rate".to_string());
        }
        if self.roas_index > 1.0 {
            out.push("roas".to_string());
        }
        out
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use insights_core::{AggregateKey, MetricCounters};

    #[test]
    fn test_unknown_industry_falls_back_to_retail() {
        assert_eq!(Industry::from_name("Salon"), Industry::Salon);
        assert_eq!(Industry::from_name("bakery"), Industry::Retail);
        assert!((Industry::Retail.benchmark().avg_roas - 2.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_comparison_against_restaurant() {
        let mut agg = MetricAggregate::new(AggregateKey::new("d1", None), "b", Utc::now());
        agg.counters = MetricCounters::from_iter([
            (MetricName::Impressions, 10_000.0),
            (MetricName::Clicks, 500.0),
            (MetricName::Conversions, 50.0),
            (MetricName::Cost, 400.0),
            (MetricName::Revenue, 2_000.0),
        ]);

        let cmp = BenchmarkComparison::compare(Industry::Restaurant, &[agg]);
        assert!((cmp.ctr - 0.05).abs() < 1e-12);
        assert!((cmp.cpc - 0.8).abs() < 1e-12);
        assert!((cmp.conversion_rate - 0.1).abs() < 1e-12);
        assert!((cmp.roas - 5.0).abs() < 1e-12);
        assert!((cmp.ctr_index - 2.0).abs() < 1e-9);
        assert_eq!(cmp.strengths, vec!["ctr", "cpc", "conversion_rate", "roas"]);
    }

    #[test]
    fn test_comparison_without_activity_is_zero() {
        let cmp = BenchmarkComparison::compare(Industry::Salon, &[]);
        assert_eq!(cmp.ctr, 0.0);
        assert_eq!(cmp.roas_index, 0.0);
        assert!(cmp.strengths.is_empty());
    }
}
