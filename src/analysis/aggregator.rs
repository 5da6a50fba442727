//! Record aggregation and derived metrics.
//!
//! This module groups records along a dimension into accumulators and
//! computes the derived figures the views consume: averages, totals,
//! NAP per deal, health index and risk amount.

use crate::models::{Dimension, Month, Record};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// Running sums for a group of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Accumulator {
    pub total_nap: f64,
    pub total_deals: f64,
    /// Reported retention values only.
    pub retention_rates: Vec<f64>,
    pub record_count: usize,
    pub months: BTreeSet<Month>,
}

impl Accumulator {
    /// Fold one record into the running sums.
    pub fn add(&mut self, record: &Record) {
        self.total_nap += record.nap;
        self.total_deals += record.deals;
        if let Some(rate) = record.retention {
            self.retention_rates.push(rate);
        }
        if let Some(month) = record.month {
            self.months.insert(month);
        }
        self.record_count += 1;
    }

    /// Whether at least one retention value was reported.
    pub fn has_retention(&self) -> bool {
        !self.retention_rates.is_empty()
    }

    /// Mean of reported retention values, 0 when none were reported.
    ///
    /// Callers deciding membership in rankings or alerts must check
    /// [`Accumulator::has_retention`] instead of trusting the 0.
    pub fn average_retention(&self) -> f64 {
        mean(&self.retention_rates)
    }

    pub fn nap_per_deal(&self) -> f64 {
        ratio(self.total_nap, self.total_deals)
    }

    pub fn health_index(&self) -> f64 {
        health_index(self.total_nap, self.average_retention())
    }

    pub fn risk_amount(&self) -> f64 {
        risk_amount(self.total_nap, self.average_retention())
    }

    /// NAP per record contributed to this group.
    pub fn mean_nap(&self) -> f64 {
        ratio(self.total_nap, self.record_count as f64)
    }

    /// Number of distinct months with at least one record.
    pub fn distinct_months(&self) -> usize {
        self.months.len()
    }
}

/// Division that yields 0 instead of NaN or infinity.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    ratio(values.iter().sum(), values.len() as f64)
}

pub fn health_index(total_nap: f64, average_retention: f64) -> f64 {
    (total_nap * average_retention) / 100.0
}

pub fn risk_amount(total_nap: f64, average_retention: f64) -> f64 {
    (total_nap * (100.0 - average_retention)) / 100.0
}

/// Accumulate every record into a single group.
pub fn totals<'a, I>(records: I) -> Accumulator
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut acc = Accumulator::default();
    for record in records {
        acc.add(record);
    }
    acc
}

/// Group records by an arbitrary key, keeping first-seen key order.
pub fn group_by<'a, I, F>(records: I, key: F) -> IndexMap<String, Accumulator>
where
    I: IntoIterator<Item = &'a Record>,
    F: Fn(&Record) -> &str,
{
    let mut grouped: IndexMap<String, Accumulator> = IndexMap::new();

    for record in records {
        let k = key(record);
        match grouped.get_mut(k) {
            Some(acc) => acc.add(record),
            None => {
                let mut acc = Accumulator::default();
                acc.add(record);
                grouped.insert(k.to_string(), acc);
            }
        }
    }

    grouped
}

/// Group records along one of the record dimensions.
pub fn group_by_dimension<'a, I>(records: I, dimension: Dimension) -> IndexMap<String, Accumulator>
where
    I: IntoIterator<Item = &'a Record>,
{
    group_by(records, |r| r.key(dimension))
}

/// Per-executive aggregate with the executive's affiliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveAggregate {
    pub executive: String,
    pub team: String,
    pub clinic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<String>,
    pub totals: Accumulator,
}

/// Aggregate records per executive, in discovery order.
///
/// Affiliation comes from the executive's first record.
pub fn aggregate_executives<'a, I>(records: I) -> Vec<ExecutiveAggregate>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut by_executive: IndexMap<&str, ExecutiveAggregate> = IndexMap::new();

    for record in records {
        by_executive
            .entry(record.executive.as_str())
            .or_insert_with(|| ExecutiveAggregate {
                executive: record.executive.clone(),
                team: record.team.clone(),
                clinic: record.clinic.clone(),
                coordinator: record.coordinator.clone(),
                totals: Accumulator::default(),
            })
            .totals
            .add(record);
    }

    by_executive.into_values().collect()
}

/// Two-stage NAP average per parent key.
///
/// Each executive's mean NAP across their own records is computed first,
/// then those means are averaged across the executives sharing the parent
/// key, so every executive weighs the same regardless of record count.
pub fn executive_weighted_nap<'a, I>(
    records: I,
    parent: Dimension,
) -> IndexMap<String, ParentAverage>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut nested: IndexMap<String, IndexMap<String, Accumulator>> = IndexMap::new();

    for record in records {
        let executives = nested.entry(record.key(parent).to_string()).or_default();
        executives
            .entry(record.executive.clone())
            .or_default()
            .add(record);
    }

    nested
        .into_iter()
        .map(|(key, executives)| {
            let means: Vec<f64> = executives.values().map(Accumulator::mean_nap).collect();
            (
                key,
                ParentAverage {
                    average_nap: mean(&means),
                    executive_count: means.len(),
                },
            )
        })
        .collect()
}

/// Result of [`executive_weighted_nap`] for one parent key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParentAverage {
    pub average_nap: f64,
    pub executive_count: usize,
}

/// Per-month figures for a set of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: Month,
    pub nap: f64,
    pub deals: f64,
    /// Mean reported retention in the month, `None` without data.
    pub retention: Option<f64>,
}

/// Monthly NAP, deals and retention in calendar order.
///
/// Every tracked month is present; months without records carry zero
/// sums and no retention.
pub fn monthly_series<'a, I>(records: I) -> Vec<MonthlyPoint>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut by_month: IndexMap<Month, Accumulator> =
        Month::ALL.iter().map(|m| (*m, Accumulator::default())).collect();

    for record in records {
        if let Some(acc) = record.month.and_then(|m| by_month.get_mut(&m)) {
            acc.add(record);
        }
    }

    by_month
        .into_iter()
        .map(|(month, acc)| MonthlyPoint {
            month,
            nap: acc.total_nap,
            deals: acc.total_deals,
            retention: acc.has_retention().then(|| acc.average_retention()),
        })
        .collect()
}

/// Distinct non-empty keys along a dimension, sorted.
pub fn distinct_sorted<'a, I>(records: I, dimension: Dimension) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let keys: BTreeSet<&str> = records
        .into_iter()
        .map(|r| r.key(dimension))
        .filter(|k| !k.is_empty())
        .collect();
    keys.into_iter().map(String::from).collect()
}

/// Executives whose team or clinic differs between records.
///
/// Affiliation is expected to be stable per executive; the first record
/// wins, and this lists the executives for which that assumption fails.
pub fn affiliation_conflicts<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut first_seen: IndexMap<&str, (&str, &str)> = IndexMap::new();
    let mut conflicts: Vec<String> = Vec::new();

    for record in records {
        let affiliation = (record.team.as_str(), record.clinic.as_str());
        let seen = first_seen
            .entry(record.executive.as_str())
            .or_insert(affiliation);
        if *seen != affiliation && !conflicts.iter().any(|c| c == &record.executive) {
            conflicts.push(record.executive.clone());
        }
    }

    conflicts
}
