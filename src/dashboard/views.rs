//! View models.
//!
//! Each view is a plain serializable value computed from a record slice
//! and the configured thresholds, plus the chart datasets it feeds.

use crate::analysis::aggregator::{
    aggregate_executives, distinct_sorted, group_by_dimension, monthly_series, ratio, totals,
    ExecutiveAggregate, MonthlyPoint,
};
use crate::analysis::comparison::{compare_with_peers, Delta, PeerComparison};
use crate::analysis::ranking::{
    health_ranking, nap_average_ranking, performance_distribution, retention_alerts,
    PerformanceDistribution, RankedExecutive, RetentionAlert,
};
use crate::config::ThresholdConfig;
use crate::dashboard::charts::{ChartData, ChartId, ChartKind, Series};
use crate::drilldown::DrillDataset;
use crate::models::{Dimension, GoalStatus, Month, Record, RetentionBand, ViewKind};
use serde::Serialize;

/// Label used for records without a coordinator.
pub const UNASSIGNED: &str = "Unassigned";

/// The computed content of one dashboard view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    Executive(ExecutiveView),
    Operational(OperationalView),
    Individual(IndividualView),
    Retention(RetentionView),
    DrillDown(DrillDataset),
    /// The view needs a selection that was not made.
    Pending { kind: ViewKind, prompt: String },
}

impl DashboardView {
    pub fn kind(&self) -> ViewKind {
        match self {
            DashboardView::Executive(_) => ViewKind::Executive,
            DashboardView::Operational(_) => ViewKind::Operational,
            DashboardView::Individual(_) => ViewKind::Individual,
            DashboardView::Retention(_) => ViewKind::Retention,
            DashboardView::DrillDown(_) => ViewKind::DrillDown,
            DashboardView::Pending { kind, .. } => *kind,
        }
    }

    /// Chart datasets backing this view.
    pub fn charts(&self) -> Vec<(ChartId, ChartData)> {
        match self {
            DashboardView::Executive(view) => view.charts(),
            DashboardView::Operational(view) => view.charts(),
            DashboardView::Individual(view) => view.charts(),
            DashboardView::Retention(view) => view.charts(),
            DashboardView::DrillDown(dataset) => vec![(ChartId::DrillDown, drill_chart(dataset))],
            DashboardView::Pending { .. } => Vec::new(),
        }
    }

    /// Alert list shown by this view and the threshold it was cut at.
    pub fn alerts(&self) -> Option<(&[RetentionAlert], f64)> {
        match self {
            DashboardView::Executive(view) => Some((view.alerts.as_slice(), view.alert_threshold)),
            DashboardView::Retention(view) => Some((view.alerts.as_slice(), view.threshold)),
            _ => None,
        }
    }
}

fn labels_of<T>(items: &[T], label: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|i| label(i).to_string()).collect()
}

fn month_labels() -> Vec<String> {
    Month::ALL.iter().map(|m| m.to_string()).collect()
}

fn optional_retention(aggregate: &ExecutiveAggregate) -> Option<f64> {
    aggregate
        .totals
        .has_retention()
        .then(|| aggregate.totals.average_retention())
}

fn band_color(band: RetentionBand) -> &'static str {
    match band {
        RetentionBand::Good => "rgb(16, 185, 129)",
        RetentionBand::Warning => "rgb(245, 158, 11)",
        RetentionBand::Critical => "rgb(239, 68, 68)",
    }
}

fn drill_chart(dataset: &DrillDataset) -> ChartData {
    ChartData {
        kind: ChartKind::Bar,
        labels: dataset.items.iter().map(|i| i.label.clone()).collect(),
        series: vec![Series::dense("Average NAP", dataset.items.iter().map(|i| i.value))
            .with_colors(dataset.items.iter().map(|i| i.color.to_string()).collect())],
    }
}

// ---------------------------------------------------------------------------
// Executive (general) view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExecutiveKpis {
    pub total_nap: f64,
    /// Mean of every reported retention value, record by record.
    pub average_retention: f64,
    pub nap_per_deal: f64,
    pub executive_count: usize,
}

/// Monthly retention averages for one team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRetentionSeries {
    pub team: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub executive: String,
    pub team: String,
    pub nap: f64,
    pub retention: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicRetention {
    pub clinic: String,
    /// `None` when no record of the clinic reports retention.
    pub retention: Option<f64>,
    pub band: Option<RetentionBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveView {
    pub kpis: ExecutiveKpis,
    pub months: Vec<Month>,
    pub retention_evolution: Vec<TeamRetentionSeries>,
    pub nap_vs_retention: Vec<ScatterPoint>,
    pub health_ranking: Vec<RankedExecutive>,
    pub retention_by_clinic: Vec<ClinicRetention>,
    pub alert_threshold: f64,
    pub alerts: Vec<RetentionAlert>,
}

impl ExecutiveView {
    pub fn build(records: &[Record], thresholds: &ThresholdConfig) -> Self {
        let overall = totals(records);
        let executives = aggregate_executives(records);

        let retention_evolution = distinct_sorted(records, Dimension::Team)
            .into_iter()
            .map(|team| {
                let values = monthly_series(records.iter().filter(|r| r.team == team))
                    .into_iter()
                    .map(|p| p.retention)
                    .collect();
                TeamRetentionSeries { team, values }
            })
            .collect();

        let nap_vs_retention = executives
            .iter()
            .filter(|e| e.totals.has_retention())
            .map(|e| ScatterPoint {
                executive: e.executive.clone(),
                team: e.team.clone(),
                nap: e.totals.total_nap,
                retention: e.totals.average_retention(),
            })
            .collect();

        let by_clinic = group_by_dimension(records, Dimension::Clinic);
        let mut retention_by_clinic: Vec<ClinicRetention> = by_clinic
            .iter()
            .map(|(clinic, acc)| {
                let retention = acc.has_retention().then(|| acc.average_retention());
                ClinicRetention {
                    clinic: clinic.clone(),
                    retention,
                    band: retention.map(|r| {
                        RetentionBand::classify(r, thresholds.band_good, thresholds.band_warning)
                    }),
                }
            })
            .collect();
        retention_by_clinic.sort_by(|a, b| a.clinic.cmp(&b.clinic));

        Self {
            kpis: ExecutiveKpis {
                total_nap: overall.total_nap,
                average_retention: overall.average_retention(),
                nap_per_deal: overall.nap_per_deal(),
                executive_count: executives.len(),
            },
            months: Month::ALL.to_vec(),
            retention_evolution,
            nap_vs_retention,
            health_ranking: health_ranking(&executives, thresholds.top_n),
            retention_by_clinic,
            alert_threshold: thresholds.alert,
            alerts: retention_alerts(&executives, thresholds.alert, thresholds.critical),
        }
    }

    pub fn charts(&self) -> Vec<(ChartId, ChartData)> {
        let evolution = ChartData {
            kind: ChartKind::Line,
            labels: month_labels(),
            series: self
                .retention_evolution
                .iter()
                .map(|t| Series::new(&t.team, t.values.clone()))
                .collect(),
        };

        let scatter = ChartData {
            kind: ChartKind::Scatter,
            labels: labels_of(&self.nap_vs_retention, |p| p.executive.as_str()),
            series: vec![
                Series::dense("NAP", self.nap_vs_retention.iter().map(|p| p.nap)),
                Series::dense("Retention", self.nap_vs_retention.iter().map(|p| p.retention)),
            ],
        };

        let ranking = ChartData {
            kind: ChartKind::Bar,
            labels: labels_of(&self.health_ranking, |r| r.executive.as_str()),
            series: vec![Series::dense(
                "Health index",
                self.health_ranking.iter().map(|r| r.health_index),
            )],
        };

        let clinics = ChartData {
            kind: ChartKind::Bar,
            labels: labels_of(&self.retention_by_clinic, |c| c.clinic.as_str()),
            series: vec![Series::new(
                "Retention",
                self.retention_by_clinic.iter().map(|c| c.retention).collect(),
            )
            .with_colors(
                self.retention_by_clinic
                    .iter()
                    .map(|c| c.band.map_or("rgb(156, 163, 175)", band_color).to_string())
                    .collect(),
            )],
        };

        vec![
            (ChartId::RetentionEvolution, evolution),
            (ChartId::NapVsRetention, scatter),
            (ChartId::HealthRanking, ranking),
            (ChartId::RetentionByClinic, clinics),
        ]
    }
}

// ---------------------------------------------------------------------------
// Operational (team) view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamKpis {
    pub total_nap: f64,
    pub average_retention: f64,
    pub executive_count: usize,
}

/// One line of the team table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveRow {
    pub executive: String,
    pub clinic: String,
    pub total_nap: f64,
    pub average_retention: Option<f64>,
    pub deals: f64,
    pub nap_per_deal: f64,
    pub health_index: f64,
}

impl From<&ExecutiveAggregate> for ExecutiveRow {
    fn from(aggregate: &ExecutiveAggregate) -> Self {
        Self {
            executive: aggregate.executive.clone(),
            clinic: aggregate.clinic.clone(),
            total_nap: aggregate.totals.total_nap,
            average_retention: optional_retention(aggregate),
            deals: aggregate.totals.total_deals,
            nap_per_deal: aggregate.totals.nap_per_deal(),
            health_index: aggregate.totals.health_index(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationalView {
    pub team: String,
    pub kpis: TeamKpis,
    pub executives: Vec<ExecutiveRow>,
    pub top_performers: Vec<RankedExecutive>,
    pub monthly: Vec<MonthlyPoint>,
    pub distribution: PerformanceDistribution,
}

impl OperationalView {
    pub fn build(records: &[Record], team: &str, thresholds: &ThresholdConfig) -> Self {
        let scoped: Vec<&Record> = records.iter().filter(|r| r.team == team).collect();
        let team_totals = totals(scoped.iter().copied());
        let executives = aggregate_executives(scoped.iter().copied());

        let mut rows: Vec<ExecutiveRow> = executives.iter().map(ExecutiveRow::from).collect();
        rows.sort_by(|a, b| a.executive.cmp(&b.executive));

        Self {
            team: team.to_string(),
            kpis: TeamKpis {
                total_nap: team_totals.total_nap,
                average_retention: team_totals.average_retention(),
                executive_count: executives.len(),
            },
            executives: rows,
            top_performers: nap_average_ranking(&executives, thresholds.team_top_n),
            monthly: monthly_series(scoped.iter().copied()),
            distribution: performance_distribution(
                &executives,
                thresholds.high_factor,
                thresholds.low_factor,
            ),
        }
    }

    pub fn charts(&self) -> Vec<(ChartId, ChartData)> {
        let performance = ChartData {
            kind: ChartKind::Bar,
            labels: labels_of(&self.executives, |r| r.executive.as_str()),
            series: vec![
                Series::dense("NAP", self.executives.iter().map(|r| r.total_nap)),
                Series::new(
                    "Retention",
                    self.executives.iter().map(|r| r.average_retention).collect(),
                ),
            ],
        };

        let monthly = ChartData {
            kind: ChartKind::Line,
            labels: month_labels(),
            series: vec![
                Series::dense("NAP", self.monthly.iter().map(|p| p.nap)),
                Series::new("Retention", self.monthly.iter().map(|p| p.retention).collect()),
            ],
        };

        let distribution = ChartData {
            kind: ChartKind::Doughnut,
            labels: vec!["High".to_string(), "Normal".to_string(), "Low".to_string()],
            series: vec![Series::dense(
                "Executives",
                [
                    self.distribution.high as f64,
                    self.distribution.normal as f64,
                    self.distribution.low as f64,
                ],
            )],
        };

        vec![
            (ChartId::TeamPerformance, performance),
            (ChartId::TeamMonthly, monthly),
            (ChartId::PerformanceDistribution, distribution),
        ]
    }
}

// ---------------------------------------------------------------------------
// Individual (executive) view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PersonalKpis {
    pub nap: f64,
    pub retention: Option<f64>,
    pub deals: f64,
}

/// The executive against the whole record set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VersusOverall {
    /// Total NAP divided by distinct executives.
    pub average_nap: f64,
    /// Record-level mean of reported retention.
    pub average_retention: f64,
    /// Percent difference against `average_nap`.
    pub nap_delta: Delta,
    /// Difference in points against `average_retention`.
    pub retention_delta: Delta,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NapGoal {
    pub goal: f64,
    pub progress: f64,
    pub status: GoalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetentionGoal {
    pub goal: f64,
    pub met: bool,
    /// Capped at 100.
    pub progress: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Goals {
    pub nap: NapGoal,
    pub retention: RetentionGoal,
}

impl Goals {
    pub fn evaluate(nap: f64, retention: f64, thresholds: &ThresholdConfig) -> Self {
        let nap_progress = ratio(nap, thresholds.nap_goal) * 100.0;
        let status = if nap_progress >= 100.0 {
            GoalStatus::Success
        } else if nap_progress >= 70.0 {
            GoalStatus::Warning
        } else {
            GoalStatus::Danger
        };

        Self {
            nap: NapGoal {
                goal: thresholds.nap_goal,
                progress: nap_progress,
                status,
            },
            retention: RetentionGoal {
                goal: thresholds.retention_goal,
                met: retention >= thresholds.retention_goal,
                progress: (ratio(retention, thresholds.retention_goal) * 100.0).min(100.0),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualView {
    pub executive: String,
    pub team: String,
    pub clinic: String,
    pub kpis: PersonalKpis,
    pub versus_overall: VersusOverall,
    pub peers: PeerComparison,
    pub monthly: Vec<MonthlyPoint>,
    pub goals: Goals,
}

impl IndividualView {
    /// Returns `None` when `executive` has no records.
    pub fn build(
        records: &[Record],
        executive: &str,
        thresholds: &ThresholdConfig,
    ) -> Option<Self> {
        let executives = aggregate_executives(records);
        let me = executives.iter().find(|e| e.executive == executive)?;
        let peers = compare_with_peers(&executives, executive)?;

        let overall = totals(records);
        let average_nap = ratio(overall.total_nap, executives.len() as f64);
        let my_retention = optional_retention(me);

        let retention_delta = match (my_retention, overall.has_retention()) {
            (Some(mine), true) => Delta::points(mine, overall.average_retention()),
            _ => Delta::NoBaseline,
        };

        Some(Self {
            executive: me.executive.clone(),
            team: me.team.clone(),
            clinic: me.clinic.clone(),
            kpis: PersonalKpis {
                nap: me.totals.total_nap,
                retention: my_retention,
                deals: me.totals.total_deals,
            },
            versus_overall: VersusOverall {
                average_nap,
                average_retention: overall.average_retention(),
                nap_delta: Delta::percent(me.totals.total_nap, average_nap),
                retention_delta,
            },
            peers,
            monthly: monthly_series(records.iter().filter(|r| r.executive == executive)),
            goals: Goals::evaluate(
                me.totals.total_nap,
                my_retention.unwrap_or(0.0),
                thresholds,
            ),
        })
    }

    pub fn charts(&self) -> Vec<(ChartId, ChartData)> {
        let monthly = ChartData {
            kind: ChartKind::Line,
            labels: month_labels(),
            series: vec![
                Series::dense("NAP", self.monthly.iter().map(|p| p.nap)),
                Series::new("Retention", self.monthly.iter().map(|p| p.retention).collect()),
                Series::dense("Deals", self.monthly.iter().map(|p| p.deals)),
            ],
        };

        let mut charts = vec![(ChartId::PersonalMonthly, monthly)];

        if let Some(baseline) = &self.peers.peers {
            let mine = self.peers.mine;
            let team = baseline.averages;
            charts.push((
                ChartId::PeerComparison,
                ChartData {
                    kind: ChartKind::Bar,
                    labels: vec!["NAP".to_string(), "Retention".to_string(), "Deals".to_string()],
                    series: vec![
                        Series::dense(&self.executive, [mine.nap, mine.retention, mine.deals]),
                        Series::dense("Team average", [team.nap, team.retention, team.deals]),
                    ],
                },
            ));
        }

        charts
    }
}

// ---------------------------------------------------------------------------
// Retention view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorSummary {
    pub coordinator: String,
    pub average_retention: Option<f64>,
    pub total_nap: f64,
    /// Executives of this coordinator present in the alert list.
    pub flagged: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionView {
    pub threshold: f64,
    pub alerts: Vec<RetentionAlert>,
    pub total_risk: f64,
    pub coordinators: Vec<CoordinatorSummary>,
}

impl RetentionView {
    pub fn build(records: &[Record], thresholds: &ThresholdConfig) -> Self {
        let executives = aggregate_executives(records);
        let alerts = retention_alerts(
            &executives,
            thresholds.retention_alert,
            thresholds.critical,
        );

        let by_coordinator = group_by_dimension(records, Dimension::Coordinator);
        let mut coordinators: Vec<CoordinatorSummary> = by_coordinator
            .iter()
            .map(|(key, acc)| {
                let flagged = alerts
                    .iter()
                    .filter(|a| a.coordinator.as_deref().unwrap_or("") == key)
                    .count();
                CoordinatorSummary {
                    coordinator: if key.is_empty() {
                        UNASSIGNED.to_string()
                    } else {
                        key.clone()
                    },
                    average_retention: acc.has_retention().then(|| acc.average_retention()),
                    total_nap: acc.total_nap,
                    flagged,
                }
            })
            .collect();
        coordinators.sort_by(|a, b| a.coordinator.cmp(&b.coordinator));

        Self {
            threshold: thresholds.retention_alert,
            total_risk: alerts.iter().map(|a| a.risk_amount).sum(),
            alerts,
            coordinators,
        }
    }

    pub fn charts(&self) -> Vec<(ChartId, ChartData)> {
        vec![(
            ChartId::CoordinatorRetention,
            ChartData {
                kind: ChartKind::Bar,
                labels: labels_of(&self.coordinators, |c| c.coordinator.as_str()),
                series: vec![
                    Series::new(
                        "Retention",
                        self.coordinators.iter().map(|c| c.average_retention).collect(),
                    ),
                    Series::dense("Flagged", self.coordinators.iter().map(|c| c.flagged as f64)),
                ],
            },
        )]
    }
}
