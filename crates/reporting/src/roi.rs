//! ROI / ROAS calculation, letter grading and budget recommendations across
//! a set of design aggregates.

use chrono::{DateTime, Utc};
use insights_core::{MetricAggregate, MetricName};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Letter grade derived from ROI and ROAS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    D,
}

impl PerformanceGrade {
    /// First matching rule wins; rules are checked from best to worst.
    pub fn from_metrics(roi: f64, roas: f64) -> Self {
        if roi > 200.0 && roas > 4.0 {
            Self::APlus
        } else if roi > 150.0 && roas > 3.0 {
            Self::A
        } else if roi > 100.0 && roas > 2.5 {
            Self::BPlus
        } else if roi > 50.0 && roas > 2.0 {
            Self::B
        } else if roi > 25.0 && roas > 1.5 {
            Self::CPlus
        } else if roi > 0.0 && roas > 1.0 {
            Self::C
        } else {
            Self::D
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for PerformanceGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    ScaleWinners,
    OptimizeUnderperforming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub recommendation_type: RecommendationType,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub design_ids: Vec<String>,
    pub impact: Priority,
    pub effort: Priority,
}

/// Financial KPIs over a set of aggregates. Ratios are rounded to two
/// decimals; totals are raw sums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiReport {
    /// `(revenue - spend) / spend * 100` (0.0 when spend is zero).
    pub roi: f64,
    /// `revenue / spend` (0.0 when spend is zero).
    pub roas: f64,
    pub cpl: f64,
    pub cpa: f64,
    pub total_spend: f64,
    pub total_revenue: f64,
    pub total_leads: f64,
    pub total_conversions: f64,
    pub grade: PerformanceGrade,
    pub recommendations: Vec<Recommendation>,
    pub computed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// RoiEngine
// ---------------------------------------------------------------------------

const SCALE_WINNERS_LIMIT: usize = 3;
const UNDERPERFORMING_LIMIT: usize = 3;
const UNDERPERFORMING_ROAS: f64 = 1.5;

#[derive(Debug, Default)]
pub struct RoiEngine;

impl RoiEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute ROI, ROAS, CPL, CPA, grade and recommendations. An empty input
    /// yields zeros and grade D.
    pub fn compute_roi(&self, aggregates: &[MetricAggregate]) -> RoiReport {
        // Summing in key order keeps the result independent of input order.
        let mut ordered: Vec<&MetricAggregate> = aggregates.iter().collect();
        ordered.sort_by_key(|a| a.key());

        let sum = |metric: MetricName| -> f64 { ordered.iter().map(|a| a.metric(metric)).sum() };
        let total_spend = sum(MetricName::Cost);
        let total_revenue = sum(MetricName::Revenue);
        let total_leads = sum(MetricName::Leads);
        let total_conversions = sum(MetricName::Conversions);

        let roi = if total_spend > 0.0 {
            (total_revenue - total_spend) / total_spend * 100.0
        } else {
            0.0
        };
        let roas = if total_spend > 0.0 {
            total_revenue / total_spend
        } else {
            0.0
        };
        let cpl = if total_spend > 0.0 && total_leads > 0.0 {
            total_spend / total_leads
        } else {
            0.0
        };
        let cpa = if total_spend > 0.0 && total_conversions > 0.0 {
            total_spend / total_conversions
        } else {
            0.0
        };

        let grade = PerformanceGrade::from_metrics(roi, roas);
        let recommendations = self.recommendations(&ordered);

        debug!(
            aggregates = aggregates.len(),
            roi,
            roas,
            grade = %grade,
            "ROI computed"
        );

        RoiReport {
            roi: round2(roi),
            roas: round2(roas),
            cpl: round2(cpl),
            cpa: round2(cpa),
            total_spend,
            total_revenue,
            total_leads,
            total_conversions,
            grade,
            recommendations,
            computed_at: Utc::now(),
        }
    }

    fn recommendations(&self, aggregates: &[&MetricAggregate]) -> Vec<Recommendation> {
        let mut ranked: Vec<&MetricAggregate> = aggregates.to_vec();
        ranked.sort_by(|a, b| {
            efficiency(b)
                .partial_cmp(&efficiency(a))
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.key().cmp(&b.key()))
        });

        let top: Vec<String> = ranked
            .iter()
            .take(SCALE_WINNERS_LIMIT)
            .map(|a| a.design_id.clone())
            .collect();

        let underperforming: Vec<String> = ranked
            .iter()
            .filter(|a| {
                let cost = a.metric(MetricName::Cost);
                cost > 0.0 && a.metric(MetricName::Revenue) / cost < UNDERPERFORMING_ROAS
            })
            .take(UNDERPERFORMING_LIMIT)
            .map(|a| a.design_id.clone())
            .collect();

        let mut recommendations = Vec::new();
        if !top.is_empty() {
            recommendations.push(Recommendation {
                id: Uuid::new_v4(),
                recommendation_type: RecommendationType::ScaleWinners,
                priority: Priority::High,
                title: "Scale Top Performing Designs".to_string(),
                description:
                    "Increase budget for your best performing designs to maximize ROI".to_string(),
                design_ids: top,
                impact: Priority::High,
                effort: Priority::Low,
            });
        }
        if !underperforming.is_empty() {
            recommendations.push(Recommendation {
                id: Uuid::new_v4(),
                recommendation_type: RecommendationType::OptimizeUnderperforming,
                priority: Priority::Medium,
                title: "Optimize Underperforming Assets".to_string(),
                description: "These designs need optimization or budget reallocation".to_string(),
                design_ids: underperforming,
                impact: Priority::Medium,
                effort: Priority::Medium,
            });
        }
        recommendations
    }
}

/// Revenue per unit of spend, with spend floored at one.
fn efficiency(aggregate: &MetricAggregate) -> f64 {
    aggregate.metric(MetricName::Revenue) / aggregate.metric(MetricName::Cost).max(1.0)
}

/// Round to two decimals with halves going up (toward +inf), so -0.125
/// becomes -0.12.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use insights_core::{AggregateKey, MetricCounters};

    fn agg(design: &str, cost: f64, revenue: f64, leads: f64, conversions: f64) -> MetricAggregate {
        let mut a = MetricAggregate::new(AggregateKey::new(design, None), "biz", Utc::now());
        a.counters = MetricCounters::from_iter([
            (MetricName::Cost, cost),
            (MetricName::Revenue, revenue),
            (MetricName::Leads, leads),
            (MetricName::Conversions, conversions),
        ]);
        a
    }

    // 1. Grades -------------------------------------------------------------

    #[test]
    fn test_grade_table() {
        assert_eq!(PerformanceGrade::from_metrics(250.0, 5.0), PerformanceGrade::APlus);
        assert_eq!(PerformanceGrade::from_metrics(160.0, 3.5), PerformanceGrade::A);
        assert_eq!(PerformanceGrade::from_metrics(120.0, 2.6), PerformanceGrade::BPlus);
        assert_eq!(PerformanceGrade::from_metrics(60.0, 2.1), PerformanceGrade::B);
        assert_eq!(PerformanceGrade::from_metrics(30.0, 1.6), PerformanceGrade::CPlus);
        assert_eq!(PerformanceGrade::from_metrics(5.0, 1.05), PerformanceGrade::C);
        assert_eq!(PerformanceGrade::from_metrics(10.0, 0.9), PerformanceGrade::D);
        assert_eq!(PerformanceGrade::from_metrics(0.0, 0.0), PerformanceGrade::D);
        // High ROI alone is not enough.
        assert_eq!(PerformanceGrade::from_metrics(300.0, 1.2), PerformanceGrade::C);
    }

    #[test]
    fn test_grade_serializes_as_letter() {
        let json = serde_json::to_string(&PerformanceGrade::BPlus).unwrap();
        assert_eq!(json, "\"B+\"");
    }

    // 2. KPIs ---------------------------------------------------------------

    #[test]
    fn test_kpis_and_rounding() {
        let engine = RoiEngine::new();
        let report = engine.compute_roi(&[
            agg("d1", 1_000.0, 2_500.0, 30.0, 7.0),
            agg("d2", 500.0, 1_000.0, 0.0, 2.0),
        ]);
        assert_eq!(report.total_spend, 1_500.0);
        assert_eq!(report.total_revenue, 3_500.0);
        assert_eq!(report.roi, 133.33);
        assert_eq!(report.roas, 2.33);
        assert_eq!(report.cpl, 50.0);
        assert_eq!(report.cpa, 166.67);
        assert_eq!(report.grade, PerformanceGrade::B);
    }

    #[test]
    fn test_round2_sends_halves_up() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(-1.5), -1.5);
        assert_eq!(round2(-33.333), -33.33);
    }

    #[test]
    fn test_no_spend_is_neutral() {
        let engine = RoiEngine::new();
        let report = engine.compute_roi(&[]);
        assert_eq!(report.roi, 0.0);
        assert_eq!(report.roas, 0.0);
        assert_eq!(report.cpl, 0.0);
        assert_eq!(report.cpa, 0.0);
        assert_eq!(report.grade, PerformanceGrade::D);
        assert!(report.recommendations.is_empty());

        let free = engine.compute_roi(&[agg("d1", 0.0, 400.0, 4.0, 1.0)]);
        assert_eq!(free.roi, 0.0);
        assert_eq!(free.cpl, 0.0);
        assert_eq!(free.grade, PerformanceGrade::D);
    }

    #[test]
    fn test_order_invariance() {
        let engine = RoiEngine::new();
        let mut aggregates = vec![
            agg("d1", 0.1, 0.7, 1.0, 3.0),
            agg("d2", 0.2, 0.3, 0.0, 1.0),
            agg("d3", 1e9, 3.3, 2.0, 0.0),
            agg("d4", 17.0, 5.0, 9.0, 4.0),
        ];
        let forward = engine.compute_roi(&aggregates);
        aggregates.reverse();
        let backward = engine.compute_roi(&aggregates);

        assert_eq!(forward.total_spend, backward.total_spend);
        assert_eq!(forward.total_revenue, backward.total_revenue);
        assert_eq!(forward.roi, backward.roi);
        assert_eq!(forward.grade, backward.grade);
        let ids = |r: &RoiReport| -> Vec<Vec<String>> {
            r.recommendations.iter().map(|x| x.design_ids.clone()).collect()
        };
        assert_eq!(ids(&forward), ids(&backward));
    }

    // 3. Recommendations ----------------------------------------------------

    #[test]
    fn test_recommendation_groups() {
        let engine = RoiEngine::new();
        let report = engine.compute_roi(&[
            agg("winner", 100.0, 900.0, 0.0, 0.0),
            agg("solid", 100.0, 400.0, 0.0, 0.0),
            agg("meh", 100.0, 140.0, 0.0, 0.0),
            agg("loser", 100.0, 20.0, 0.0, 0.0),
            agg("organic", 0.0, 50.0, 0.0, 0.0),
        ]);

        let scale = &report.recommendations[0];
        assert_eq!(scale.recommendation_type, RecommendationType::ScaleWinners);
        assert_eq!(scale.priority, Priority::High);
        assert_eq!(scale.design_ids, vec!["organic", "winner", "solid"]);

        let optimize = &report.recommendations[1];
        assert_eq!(optimize.recommendation_type, RecommendationType::OptimizeUnderperforming);
        assert_eq!(optimize.priority, Priority::Medium);
        assert_eq!(optimize.design_ids, vec!["meh", "loser"]);
    }

    #[test]
    fn test_no_underperformers_means_single_group() {
        let engine = RoiEngine::new();
        let report = engine.compute_roi(&[agg("d1", 10.0, 100.0, 0.0, 0.0)]);
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(
            report.recommendations[0].recommendation_type,
            RecommendationType::ScaleWinners
        );
    }
}
