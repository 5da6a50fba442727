//! Rankings, alert lists and performance buckets over executive aggregates.

use crate::analysis::aggregator::{ratio, ExecutiveAggregate};
use crate::models::AlertLevel;
use serde::Serialize;
use std::cmp::Ordering;

/// Stable top-N selection, highest metric first.
///
/// Items with equal metrics keep their input order.
pub fn top_by<T, F>(mut items: Vec<T>, n: usize, metric: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| metric(b).partial_cmp(&metric(a)).unwrap_or(Ordering::Equal));
    items.truncate(n);
    items
}

/// An executive's position in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedExecutive {
    pub executive: String,
    pub team: String,
    pub total_nap: f64,
    pub average_nap: f64,
    pub average_retention: f64,
    pub health_index: f64,
}

impl From<&ExecutiveAggregate> for RankedExecutive {
    fn from(aggregate: &ExecutiveAggregate) -> Self {
        Self {
            executive: aggregate.executive.clone(),
            team: aggregate.team.clone(),
            total_nap: aggregate.totals.total_nap,
            average_nap: aggregate.totals.mean_nap(),
            average_retention: aggregate.totals.average_retention(),
            health_index: aggregate.totals.health_index(),
        }
    }
}

/// Top executives by health index.
///
/// Executives without any reported retention have no meaningful health
/// index and are left out.
pub fn health_ranking(executives: &[ExecutiveAggregate], n: usize) -> Vec<RankedExecutive> {
    let candidates: Vec<RankedExecutive> = executives
        .iter()
        .filter(|e| e.totals.has_retention())
        .map(RankedExecutive::from)
        .collect();

    top_by(candidates, n, |e| e.health_index)
}

/// Top executives by mean NAP per record.
pub fn nap_average_ranking(executives: &[ExecutiveAggregate], n: usize) -> Vec<RankedExecutive> {
    let candidates: Vec<RankedExecutive> = executives.iter().map(RankedExecutive::from).collect();
    top_by(candidates, n, |e| e.average_nap)
}

/// An executive flagged for low retention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionAlert {
    pub executive: String,
    pub team: String,
    pub clinic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<String>,
    pub level: AlertLevel,
    pub retention: f64,
    pub total_nap: f64,
    pub total_deals: f64,
    /// NAP exposed by the retention shortfall.
    pub risk_amount: f64,
    pub active_months: usize,
    /// Total NAP divided by distinct active months.
    pub monthly_nap: f64,
    /// Total deals divided by distinct active months.
    pub monthly_deals: f64,
}

/// Executives whose average retention falls below `threshold`.
///
/// Only executives with reported retention are considered. Worst first;
/// ties keep discovery order. Alerts under `critical_below` are marked
/// critical.
pub fn retention_alerts(
    executives: &[ExecutiveAggregate],
    threshold: f64,
    critical_below: f64,
) -> Vec<RetentionAlert> {
    let mut alerts: Vec<RetentionAlert> = executives
        .iter()
        .filter(|e| e.totals.has_retention())
        .filter(|e| e.totals.average_retention() < threshold)
        .map(|e| {
            let retention = e.totals.average_retention();
            let months = e.totals.distinct_months();
            RetentionAlert {
                executive: e.executive.clone(),
                team: e.team.clone(),
                clinic: e.clinic.clone(),
                coordinator: e.coordinator.clone(),
                level: if retention < critical_below {
                    AlertLevel::Critical
                } else {
                    AlertLevel::Warning
                },
                retention,
                total_nap: e.totals.total_nap,
                total_deals: e.totals.total_deals,
                risk_amount: e.totals.risk_amount(),
                active_months: months,
                monthly_nap: ratio(e.totals.total_nap, months as f64),
                monthly_deals: ratio(e.totals.total_deals, months as f64),
            }
        })
        .collect();

    alerts.sort_by(|a, b| a.retention.partial_cmp(&b.retention).unwrap_or(Ordering::Equal));
    alerts
}

/// Counts of executives above, around and below the group's mean NAP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerformanceDistribution {
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

/// Bucket executives by total NAP relative to the group mean.
///
/// High is strictly above `mean * high_factor`, low strictly below
/// `mean * low_factor`.
pub fn performance_distribution(
    executives: &[ExecutiveAggregate],
    high_factor: f64,
    low_factor: f64,
) -> PerformanceDistribution {
    let naps: Vec<f64> = executives.iter().map(|e| e.totals.total_nap).collect();
    let average = crate::analysis::aggregator::mean(&naps);

    let mut distribution = PerformanceDistribution::default();
    for nap in naps {
        if nap > average * high_factor {
            distribution.high += 1;
        } else if nap < average * low_factor {
            distribution.low += 1;
        } else {
            distribution.normal += 1;
        }
    }
    distribution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::aggregate_executives;
    use crate::analysis::fixtures::{record, scenario_records};
    use crate::models::{Month, Record};

    fn names<T, F: Fn(&T) -> &str>(items: &[T], f: F) -> Vec<&str> {
        items.iter().map(f).collect()
    }

    #[test]
    fn test_scenario_flags_only_b() {
        let execs = aggregate_executives(&scenario_records());
        let alerts = retention_alerts(&execs, 70.0, 60.0);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].executive, "B");
        assert_eq!(alerts[0].retention, 60.0);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(alerts[0].risk_amount, 20.0);
    }

    #[test]
    fn test_alerts_skip_executives_without_retention() {
        let records = vec![
            record("NoData", "T1", "Norte", 500.0, 0.0, 1.0, Some(Month::June)),
            record("Low", "T1", "Norte", 100.0, 40.0, 1.0, Some(Month::June)),
        ];
        let execs = aggregate_executives(&records);
        let alerts = retention_alerts(&execs, 70.0, 60.0);

        assert_eq!(names(&alerts, |a| a.executive.as_str()), vec!["Low"]);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
    }

    #[test]
    fn test_alerts_sorted_worst_first_with_stable_ties() {
        let records = vec![
            record("First65", "T1", "Norte", 1.0, 65.0, 1.0, None),
            record("Worst", "T1", "Norte", 1.0, 30.0, 1.0, None),
            record("Second65", "T2", "Norte", 1.0, 65.0, 1.0, None),
            record("Fine", "T2", "Norte", 1.0, 90.0, 1.0, None),
        ];
        let execs = aggregate_executives(&records);
        let alerts = retention_alerts(&execs, 70.0, 60.0);

        assert_eq!(
            names(&alerts, |a| a.executive.as_str()),
            vec!["Worst", "First65", "Second65"]
        );
    }

    #[test]
    fn test_retention_variant_threshold() {
        let execs = aggregate_executives(&scenario_records());
        let alerts = retention_alerts(&execs, 80.0, 60.0);
        // A sits exactly at 80 and is not below the threshold.
        assert_eq!(names(&alerts, |a| a.executive.as_str()), vec!["B"]);
    }

    #[test]
    fn test_alert_monthly_normalization_uses_distinct_months() {
        let records = vec![
            record("A", "T1", "Norte", 300.0, 50.0, 3.0, Some(Month::June)),
            record("A", "T1", "Sur", 100.0, 50.0, 1.0, Some(Month::June)),
            record("A", "T1", "Norte", 200.0, 50.0, 2.0, Some(Month::July)),
        ];
        let execs = aggregate_executives(&records);
        let alerts = retention_alerts(&execs, 70.0, 60.0);

        assert_eq!(alerts[0].active_months, 2);
        assert_eq!(alerts[0].monthly_nap, 300.0);
        assert_eq!(alerts[0].monthly_deals, 3.0);
    }

    #[test]
    fn test_alert_without_months_is_guarded() {
        let records = vec![record("A", "T1", "Norte", 300.0, 50.0, 3.0, None)];
        let execs = aggregate_executives(&records);
        let alerts = retention_alerts(&execs, 70.0, 60.0);

        assert_eq!(alerts[0].active_months, 0);
        assert_eq!(alerts[0].monthly_nap, 0.0);
        assert_eq!(alerts[0].monthly_deals, 0.0);
    }

    #[test]
    fn test_empty_alert_list_when_everyone_is_healthy() {
        let records = vec![record("A", "T1", "Norte", 300.0, 95.0, 3.0, None)];
        let execs = aggregate_executives(&records);
        assert!(retention_alerts(&execs, 70.0, 60.0).is_empty());
    }

    #[test]
    fn test_health_ranking_ties_keep_insertion_order() {
        // Equal health index of 80 for Tie1 and Tie2.
        let records = vec![
            record("Low", "T1", "Norte", 10.0, 50.0, 1.0, None),
            record("Tie1", "T1", "Norte", 100.0, 80.0, 1.0, None),
            record("Tie2", "T2", "Norte", 160.0, 50.0, 1.0, None),
            record("Top", "T2", "Norte", 1000.0, 90.0, 1.0, None),
        ];
        let execs = aggregate_executives(&records);
        let ranking = health_ranking(&execs, 10);

        assert_eq!(
            names(&ranking, |r| r.executive.as_str()),
            vec!["Top", "Tie1", "Tie2", "Low"]
        );
    }

    #[test]
    fn test_health_ranking_truncates_and_skips_no_retention() {
        let mut records: Vec<Record> = (0..12)
            .map(|i| record(&format!("E{i}"), "T1", "Norte", 100.0 + i as f64, 80.0, 1.0, None))
            .collect();
        records.push(record("Silent", "T1", "Norte", 99_999.0, 0.0, 1.0, None));

        let execs = aggregate_executives(&records);
        let ranking = health_ranking(&execs, 10);

        assert_eq!(ranking.len(), 10);
        assert_eq!(ranking[0].executive, "E11");
        assert!(ranking.iter().all(|r| r.executive != "Silent"));
    }

    #[test]
    fn test_nap_average_ranking() {
        let records = vec![
            record("A", "T1", "Norte", 100.0, 0.0, 1.0, Some(Month::June)),
            record("A", "T1", "Norte", 100.0, 0.0, 1.0, Some(Month::July)),
            record("B", "T1", "Norte", 150.0, 0.0, 1.0, Some(Month::June)),
        ];
        let execs = aggregate_executives(&records);
        let ranking = nap_average_ranking(&execs, 3);

        assert_eq!(names(&ranking, |r| r.executive.as_str()), vec!["B", "A"]);
        assert_eq!(ranking[1].average_nap, 100.0);
    }

    #[test]
    fn test_performance_distribution() {
        // Mean is 100: 130 is high, 70 is low, both 100s are normal.
        let records = vec![
            record("A", "T1", "Norte", 130.0, 0.0, 1.0, None),
            record("B", "T1", "Norte", 70.0, 0.0, 1.0, None),
            record("C", "T1", "Norte", 100.0, 0.0, 1.0, None),
            record("D", "T1", "Norte", 100.0, 0.0, 1.0, None),
        ];
        let execs = aggregate_executives(&records);
        let distribution = performance_distribution(&execs, 1.2, 0.8);

        assert_eq!(
            distribution,
            PerformanceDistribution {
                high: 1,
                normal: 2,
                low: 1
            }
        );
        assert_eq!(
            performance_distribution(&[], 1.2, 0.8),
            PerformanceDistribution::default()
        );
    }
}
