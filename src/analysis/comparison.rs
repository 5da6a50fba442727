//! Comparison of one executive against a baseline.
//!
//! The peer baseline is every other executive of the same team. A team
//! with a single member has no baseline; the deltas then carry an explicit
//! [`Delta::NoBaseline`] marker instead of NaN.

use crate::analysis::aggregator::{mean, ExecutiveAggregate};
use crate::models::Trend;
use serde::Serialize;

/// Difference between a value and its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delta {
    /// Defined difference with its direction.
    Change { value: f64, trend: Trend },
    /// No usable baseline (no peers, or a zero baseline for a percentage).
    NoBaseline,
}

impl Delta {
    /// Percentage change `(mine - baseline) / baseline * 100`.
    pub fn percent(mine: f64, baseline: f64) -> Self {
        if baseline == 0.0 || !baseline.is_finite() {
            return Delta::NoBaseline;
        }
        let value = (mine - baseline) / baseline * 100.0;
        Delta::Change {
            value,
            trend: Trend::from_difference(value),
        }
    }

    /// Absolute difference in points, for values already in percent.
    pub fn points(mine: f64, baseline: f64) -> Self {
        let value = mine - baseline;
        Delta::Change {
            value,
            trend: Trend::from_difference(value),
        }
    }

    #[allow(dead_code)] // Accessor for callers that only need the number
    pub fn value(&self) -> Option<f64> {
        match self {
            Delta::Change { value, .. } => Some(*value),
            Delta::NoBaseline => None,
        }
    }
}

/// The figures being compared for a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSet {
    pub nap: f64,
    pub retention: f64,
    pub deals: f64,
}

impl From<&ExecutiveAggregate> for MetricSet {
    fn from(aggregate: &ExecutiveAggregate) -> Self {
        Self {
            nap: aggregate.totals.total_nap,
            retention: aggregate.totals.average_retention(),
            deals: aggregate.totals.total_deals,
        }
    }
}

/// Averages over an executive's team peers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeerBaseline {
    pub peer_count: usize,
    pub averages: MetricSet,
}

/// Baseline from every executive of `team` except `executive`.
///
/// Retention is the mean of each peer's own average, peers without
/// reported retention contributing 0. Returns `None` without peers.
pub fn peer_baseline(
    executives: &[ExecutiveAggregate],
    executive: &str,
    team: &str,
) -> Option<PeerBaseline> {
    let peers: Vec<MetricSet> = executives
        .iter()
        .filter(|e| e.team == team && e.executive != executive)
        .map(MetricSet::from)
        .collect();

    if peers.is_empty() {
        return None;
    }

    let naps: Vec<f64> = peers.iter().map(|p| p.nap).collect();
    let retentions: Vec<f64> = peers.iter().map(|p| p.retention).collect();
    let deals: Vec<f64> = peers.iter().map(|p| p.deals).collect();

    Some(PeerBaseline {
        peer_count: peers.len(),
        averages: MetricSet {
            nap: mean(&naps),
            retention: mean(&retentions),
            deals: mean(&deals),
        },
    })
}

/// One executive measured against their team peers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerComparison {
    pub executive: String,
    pub team: String,
    pub mine: MetricSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<PeerBaseline>,
    pub nap_delta: Delta,
    pub retention_delta: Delta,
    pub deals_delta: Delta,
}

/// Compare `executive` with the rest of their team.
///
/// Returns `None` when the executive does not appear in `executives`.
pub fn compare_with_peers(
    executives: &[ExecutiveAggregate],
    executive: &str,
) -> Option<PeerComparison> {
    let me = executives.iter().find(|e| e.executive == executive)?;
    let mine = MetricSet::from(me);
    let peers = peer_baseline(executives, &me.executive, &me.team);

    let delta = |pick: fn(&MetricSet) -> f64| match &peers {
        Some(baseline) => Delta::percent(pick(&mine), pick(&baseline.averages)),
        None => Delta::NoBaseline,
    };

    Some(PeerComparison {
        executive: me.executive.clone(),
        team: me.team.clone(),
        mine,
        nap_delta: delta(|m| m.nap),
        retention_delta: delta(|m| m.retention),
        deals_delta: delta(|m| m.deals),
        peers,
    })
}
