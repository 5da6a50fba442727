//! Dashboard session state.
//!
//! [`Dashboard`] owns the loaded records, the active filters, the
//! drill-down navigation state and the chart registry. Every view switch,
//! filter change or drill-down click recomputes the affected derived state
//! synchronously and replaces it.

pub mod charts;
pub mod views;

pub use charts::{ChartEntry, ChartRegistry};
pub use views::DashboardView;

use crate::analysis::aggregator::{affiliation_conflicts, aggregate_executives, distinct_sorted};
use crate::analysis::ranking::{retention_alerts, RetentionAlert};
use crate::config::ThresholdConfig;
use crate::drilldown::{build_dataset, DrillDataset, DrillDownState};
use crate::models::{Dimension, Record, ViewKind};
use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use views::{ExecutiveView, IndividualView, OperationalView, RetentionView};

/// Selections that parameterize the team and executive views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub team: Option<String>,
    pub executive: Option<String>,
}

/// Distinct values offered by the selection controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub clinics: Vec<String>,
    pub teams: Vec<String>,
    pub executives: Vec<String>,
    pub coordinators: Vec<String>,
}

/// In-memory dashboard session.
#[derive(Debug)]
pub struct Dashboard {
    records: Vec<Record>,
    filters: Vec<(Dimension, String)>,
    thresholds: ThresholdConfig,
    charts: ChartRegistry,
    drill: DrillDownState,
    current_view: Option<ViewKind>,
    /// `None` until computed; an empty list is a computed result.
    alerts: Option<Vec<RetentionAlert>>,
}

impl Dashboard {
    pub fn new(records: Vec<Record>, thresholds: ThresholdConfig) -> Self {
        let conflicts = affiliation_conflicts(&records);
        if !conflicts.is_empty() {
            warn!(
                "{} executive(s) appear under more than one team or clinic; using the first seen: {}",
                conflicts.len(),
                conflicts.join(", ")
            );
        }
        info!("Dashboard loaded with {} records", records.len());

        Self {
            records,
            filters: Vec::new(),
            thresholds,
            charts: ChartRegistry::new(),
            drill: DrillDownState::new(),
            current_view: None,
            alerts: None,
        }
    }

    /// Records remaining after the applied filters.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Applied filters as `Dimension = key` strings.
    pub fn filter_descriptions(&self) -> Vec<String> {
        self.filters
            .iter()
            .map(|(dimension, key)| format!("{dimension} = {key}"))
            .collect()
    }

    /// Restrict the working record set to `key` along `dimension`.
    ///
    /// Derived state computed from the previous record set is dropped.
    pub fn apply_filter(&mut self, dimension: Dimension, key: &str) {
        let before = self.records.len();
        self.records.retain(|r| r.key(dimension) == key);
        debug!(
            "Filter {} = {} kept {} of {} records",
            dimension,
            key,
            self.records.len(),
            before
        );
        if self.records.is_empty() {
            warn!("No records match {} = {}", dimension, key);
        }

        self.filters.push((dimension, key.to_string()));
        self.alerts = None;
        self.drill = DrillDownState::new();
        self.charts.clear();
        self.current_view = None;
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            clinics: distinct_sorted(&self.records, Dimension::Clinic),
            teams: distinct_sorted(&self.records, Dimension::Team),
            executives: distinct_sorted(&self.records, Dimension::Executive),
            coordinators: distinct_sorted(&self.records, Dimension::Coordinator),
        }
    }

    /// Alerts at the general threshold, computed on first use.
    pub fn alerts(&mut self) -> &[RetentionAlert] {
        let records = &self.records;
        let thresholds = &self.thresholds;
        self.alerts.get_or_insert_with(|| {
            let executives = aggregate_executives(records);
            retention_alerts(&executives, thresholds.alert, thresholds.critical)
        })
    }

    /// Alert count and threshold for a run summary.
    ///
    /// Views with their own alert list report that list; the others fall
    /// back to the alerts at the general threshold.
    pub fn alert_summary(&mut self, view: &DashboardView) -> (usize, f64) {
        match view.alerts() {
            Some((alerts, threshold)) => (alerts.len(), threshold),
            None => (self.alerts().len(), self.thresholds.alert),
        }
    }

    #[allow(dead_code)] // Inspection accessor
    pub fn alerts_computed(&self) -> bool {
        self.alerts.is_some()
    }

    /// Compute `kind` and install its charts.
    ///
    /// Switching to a different view disposes the charts of the previous
    /// one first.
    pub fn show(&mut self, kind: ViewKind, selection: &Selection) -> DashboardView {
        if self.current_view != Some(kind) {
            if let Some(previous) = self.current_view {
                debug!("Switching view from {} to {}", previous, kind);
            }
            self.charts.clear();
            self.current_view = Some(kind);
        }

        let view = self.compute(kind, selection);
        for (id, data) in view.charts() {
            self.charts.install(id, data);
        }
        view
    }

    fn compute(&mut self, kind: ViewKind, selection: &Selection) -> DashboardView {
        match kind {
            ViewKind::Executive => {
                let view = ExecutiveView::build(&self.records, &self.thresholds);
                self.alerts = Some(view.alerts.clone());
                DashboardView::Executive(view)
            }
            ViewKind::Operational => match selection.team.as_deref() {
                Some(team) => DashboardView::Operational(OperationalView::build(
                    &self.records,
                    team,
                    &self.thresholds,
                )),
                None => DashboardView::Pending {
                    kind,
                    prompt: "Select a team to see its operational view".to_string(),
                },
            },
            ViewKind::Individual => match selection.executive.as_deref() {
                Some(executive) => {
                    match IndividualView::build(&self.records, executive, &self.thresholds) {
                        Some(view) => DashboardView::Individual(view),
                        None => DashboardView::Pending {
                            kind,
                            prompt: format!("No records for executive '{executive}'"),
                        },
                    }
                }
                None => DashboardView::Pending {
                    kind,
                    prompt: "Select an executive to see their individual view".to_string(),
                },
            },
            ViewKind::Retention => {
                DashboardView::Retention(RetentionView::build(&self.records, &self.thresholds))
            }
            ViewKind::DrillDown => DashboardView::DrillDown(self.drill_dataset()),
        }
    }

    #[allow(dead_code)] // Inspection accessor
    pub fn drill_state(&self) -> &DrillDownState {
        &self.drill
    }

    /// Dataset for the current drill-down scope.
    pub fn drill_dataset(&self) -> DrillDataset {
        build_dataset(&self.drill, &self.records)
    }

    /// Click on a drill-down item.
    ///
    /// Fails when `key` is not an item of the current level. Returns
    /// `Ok(false)` at the executive level, where clicks do nothing.
    pub fn drill_select(&mut self, key: &str) -> Result<bool> {
        let dataset = self.drill_dataset();
        if !dataset.can_drill {
            debug!("Ignoring click on '{}' at the executive level", key);
            return Ok(false);
        }
        if !dataset.has_label(key) {
            bail!(
                "'{}' is not a {:?} in the current scope (expected one of: {})",
                key,
                dataset.level,
                dataset.labels().join(", ")
            );
        }

        let moved = self.drill.select(key);
        self.refresh_drill_chart();
        Ok(moved)
    }

    /// Go up one drill-down level. Returns `false` at the top.
    pub fn drill_back(&mut self) -> bool {
        let moved = self.drill.back();
        if moved {
            self.refresh_drill_chart();
        }
        moved
    }

    fn refresh_drill_chart(&mut self) {
        if self.current_view == Some(ViewKind::DrillDown) {
            let view = DashboardView::DrillDown(self.drill_dataset());
            for (id, data) in view.charts() {
                self.charts.install(id, data);
            }
        }
    }

    pub fn charts(&self) -> &ChartRegistry {
        &self.charts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::aggregate_executives;
    use crate::analysis::fixtures::{record, scenario_records};
    use crate::analysis::ranking::{health_ranking, top_by};
    use crate::dashboard::charts::ChartId;
    use crate::drilldown::DrillLevel;
    use crate::models::Month;
    use pretty_assertions::assert_eq;

    fn sample_records() -> Vec<Record> {
        let mut records = vec![
            record("Ana", "T1", "Norte", 400.0, 90.0, 2.0, Some(Month::June)),
            record("Ana", "T1", "Norte", 200.0, 80.0, 2.0, Some(Month::July)),
            record("Beto", "T1", "Sur", 100.0, 50.0, 1.0, Some(Month::June)),
            record("Caro", "T2", "Sur", 300.0, 65.0, 3.0, Some(Month::July)),
            record("Dani", "T2", "Norte", 50.0, 0.0, 1.0, Some(Month::August)),
        ];
        records[3].coordinator = Some("Luis".to_string());
        records[4].coordinator = Some("Luis".to_string());
        records
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(sample_records(), ThresholdConfig::default())
    }

    #[test]
    fn test_alerts_computed_lazily() {
        let mut dashboard = Dashboard::new(
            vec![record("A", "T1", "Norte", 100.0, 95.0, 1.0, None)],
            ThresholdConfig::default(),
        );
        assert!(!dashboard.alerts_computed());

        // Computed and empty is distinct from not computed.
        assert!(dashboard.alerts().is_empty());
        assert!(dashboard.alerts_computed());
    }

    #[test]
    fn test_scenario_alerts() {
        let mut dashboard = Dashboard::new(scenario_records(), ThresholdConfig::default());
        let flagged: Vec<&str> = dashboard.alerts().iter().map(|a| a.executive.as_str()).collect();
        assert_eq!(flagged, vec!["B"]);
    }

    #[test]
    fn test_filter_options() {
        let options = dashboard().filter_options();
        assert_eq!(options.clinics, vec!["Norte", "Sur"]);
        assert_eq!(options.teams, vec!["T1", "T2"]);
        assert_eq!(options.executives, vec!["Ana", "Beto", "Caro", "Dani"]);
        assert_eq!(options.coordinators, vec!["Luis"]);
    }

    #[test]
    fn test_coordinator_filter_resets_derived_state() {
        let mut dashboard = dashboard();
        dashboard.alerts();
        dashboard.show(ViewKind::Executive, &Selection::default());
        assert!(!dashboard.charts().is_empty());

        dashboard.apply_filter(Dimension::Coordinator, "Luis");
        assert_eq!(dashboard.records().len(), 2);
        assert!(!dashboard.alerts_computed());
        assert!(dashboard.charts().is_empty());
        assert_eq!(dashboard.filter_descriptions(), vec!["Coordinator = Luis"]);
    }

    #[test]
    fn test_view_switch_clears_previous_charts() {
        let mut dashboard = dashboard();
        dashboard.show(ViewKind::Executive, &Selection::default());
        assert_eq!(dashboard.charts().len(), 4);
        assert!(dashboard.charts().get(ChartId::HealthRanking).is_some());

        dashboard.show(ViewKind::Retention, &Selection::default());
        assert_eq!(dashboard.charts().len(), 1);
        assert!(dashboard.charts().get(ChartId::HealthRanking).is_none());
        assert_eq!(dashboard.charts().disposed_count(), 4);
    }

    #[test]
    fn test_same_view_replaces_in_place() {
        let mut dashboard = dashboard();
        dashboard.show(ViewKind::Retention, &Selection::default());
        dashboard.show(ViewKind::Retention, &Selection::default());

        assert_eq!(dashboard.charts().len(), 1);
        assert_eq!(dashboard.charts().disposed_count(), 1);
    }

    #[test]
    fn test_operational_view_requires_team() {
        let mut dashboard = dashboard();
        let view = dashboard.show(ViewKind::Operational, &Selection::default());
        assert!(matches!(view, DashboardView::Pending { .. }));
        assert!(dashboard.charts().is_empty());

        let selection = Selection {
            team: Some("T1".to_string()),
            executive: None,
        };
        let view = dashboard.show(ViewKind::Operational, &selection);
        assert!(matches!(view, DashboardView::Operational(ref v) if v.team == "T1"));
    }

    #[test]
    fn test_individual_view_requires_known_executive() {
        let mut dashboard = dashboard();
        let selection = Selection {
            team: None,
            executive: Some("Nobody".to_string()),
        };
        let view = dashboard.show(ViewKind::Individual, &selection);
        assert!(matches!(view, DashboardView::Pending { .. }));
    }

    #[test]
    fn test_alert_summary_follows_rendered_view() {
        let mut dashboard = Dashboard::new(
            vec![
                record("Ana", "T1", "Norte", 100.0, 75.0, 1.0, Some(Month::June)),
                record("Beto", "T1", "Norte", 100.0, 90.0, 1.0, Some(Month::June)),
            ],
            ThresholdConfig::default(),
        );

        let view = dashboard.show(ViewKind::Retention, &Selection::default());
        let listed = match view {
            DashboardView::Retention(ref v) => v.alerts.len(),
            _ => panic!("expected the retention view"),
        };
        assert_eq!(listed, 1);
        assert_eq!(dashboard.alert_summary(&view), (listed, 80.0));

        // Ana sits above the general threshold.
        let view = dashboard.show(ViewKind::Executive, &Selection::default());
        assert_eq!(dashboard.alert_summary(&view), (0, 70.0));

        let view = dashboard.show(ViewKind::DrillDown, &Selection::default());
        assert_eq!(dashboard.alert_summary(&view), (0, 70.0));
    }

    #[test]
    fn test_executive_view_populates_alert_cache() {
        let mut dashboard = dashboard();
        dashboard.show(ViewKind::Executive, &Selection::default());
        assert!(dashboard.alerts_computed());
    }

    #[test]
    fn test_drill_navigation_reinstalls_chart() {
        let mut dashboard = dashboard();
        dashboard.show(ViewKind::DrillDown, &Selection::default());
        assert_eq!(dashboard.charts().disposed_count(), 0);

        assert!(dashboard.drill_select("Norte").unwrap());
        assert_eq!(dashboard.drill_state().level(), DrillLevel::Team);
        assert_eq!(dashboard.charts().disposed_count(), 1);
        assert_eq!(
            dashboard.charts().get(ChartId::DrillDown).map(|c| c.labels.clone()),
            Some(vec!["T1".to_string(), "T2".to_string()])
        );

        assert!(dashboard.drill_select("T2").unwrap());
        assert_eq!(dashboard.drill_dataset().labels(), vec!["Dani"]);

        // Leaf level: clicks are ignored.
        assert!(!dashboard.drill_select("Dani").unwrap());

        assert!(dashboard.drill_back());
        assert!(dashboard.drill_back());
        assert!(!dashboard.drill_back());
        assert_eq!(dashboard.drill_state(), &DrillDownState::new());
    }

    #[test]
    fn test_drill_select_unknown_key_fails() {
        let mut dashboard = dashboard();
        assert!(dashboard.drill_select("Atlantis").is_err());
        assert_eq!(dashboard.drill_state().level(), DrillLevel::Clinic);
    }

    #[test]
    fn test_rank_then_filter_matches_filter_then_rank() {
        let records = sample_records();
        let everyone = aggregate_executives(&records);
        let all = everyone.len();

        for team in ["T1", "T2"] {
            let mut dashboard = Dashboard::new(records.clone(), ThresholdConfig::default());
            dashboard.apply_filter(Dimension::Team, team);
            let members = aggregate_executives(dashboard.records());

            let ranked_then_filtered: Vec<(String, f64)> = health_ranking(&everyone, all)
                .into_iter()
                .filter(|e| e.team == team)
                .map(|e| (e.executive, e.health_index))
                .collect();
            let filtered_then_ranked: Vec<(String, f64)> = health_ranking(&members, all)
                .into_iter()
                .map(|e| (e.executive, e.health_index))
                .collect();
            assert_eq!(ranked_then_filtered, filtered_then_ranked);

            let by_nap_then_filtered: Vec<String> =
                top_by(everyone.clone(), all, |e| e.totals.total_nap)
                    .into_iter()
                    .filter(|e| e.team == team)
                    .map(|e| e.executive)
                    .collect();
            let filtered_then_by_nap: Vec<String> = top_by(members, all, |e| e.totals.total_nap)
                .into_iter()
                .map(|e| e.executive)
                .collect();
            assert_eq!(by_nap_then_filtered, filtered_then_by_nap);
        }
    }
}
