//! Chart datasets and the registry that owns them.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Identity of a chart on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    RetentionEvolution,
    NapVsRetention,
    HealthRanking,
    RetentionByClinic,
    TeamPerformance,
    TeamMonthly,
    PerformanceDistribution,
    PersonalMonthly,
    PeerComparison,
    CoordinatorRetention,
    DrillDown,
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            ChartId::RetentionEvolution => "Retention evolution by team",
            ChartId::NapVsRetention => "NAP vs retention",
            ChartId::HealthRanking => "Health ranking",
            ChartId::RetentionByClinic => "Retention by clinic",
            ChartId::TeamPerformance => "Team performance",
            ChartId::TeamMonthly => "Team monthly evolution",
            ChartId::PerformanceDistribution => "Performance distribution",
            ChartId::PersonalMonthly => "Monthly performance",
            ChartId::PeerComparison => "Peer comparison",
            ChartId::CoordinatorRetention => "Retention by coordinator",
            ChartId::DrillDown => "NAP drill-down",
        };
        write!(f, "{title}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Doughnut,
}

/// One named series of a chart. `None` values are gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
    /// Per-point colors; empty when the series uses a single color.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
}

impl Series {
    pub fn new(name: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.to_string(),
            values,
            colors: Vec::new(),
        }
    }

    /// Series without gaps.
    pub fn dense(name: &str, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Some).collect())
    }

    pub fn with_colors(mut self, colors: Vec<String>) -> Self {
        self.colors = colors;
        self
    }
}

/// Dataset backing a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

/// A chart as it appears in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartEntry {
    pub id: ChartId,
    pub data: ChartData,
}

/// Owned set of live chart datasets, at most one per [`ChartId`].
#[derive(Debug, Default)]
pub struct ChartRegistry {
    charts: BTreeMap<ChartId, ChartData>,
    disposed: usize,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a dataset, disposing whatever was registered under `id`
    /// first.
    pub fn install(&mut self, id: ChartId, data: ChartData) {
        if let Some(previous) = self.charts.remove(&id) {
            self.dispose(id, previous);
        }
        debug!("Installing chart {:?} ({} labels)", id, data.labels.len());
        self.charts.insert(id, data);
    }

    /// Dispose every registered dataset.
    pub fn clear(&mut self) {
        for (id, data) in std::mem::take(&mut self.charts) {
            self.dispose(id, data);
        }
    }

    fn dispose(&mut self, id: ChartId, data: ChartData) {
        debug!("Disposing chart {:?} ({} labels)", id, data.labels.len());
        self.disposed += 1;
        drop(data);
    }

    #[allow(dead_code)] // Lookup by id; reports use entries()
    pub fn get(&self, id: ChartId) -> Option<&ChartData> {
        self.charts.get(&id)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    /// Number of datasets disposed over the registry's lifetime.
    pub fn disposed_count(&self) -> usize {
        self.disposed
    }

    /// Snapshot of the live charts in id order.
    pub fn entries(&self) -> Vec<ChartEntry> {
        self.charts
            .iter()
            .map(|(id, data)| ChartEntry {
                id: *id,
                data: data.clone(),
            })
            .collect()
    }
}
