//! Clinic -> team -> executive drill-down navigation.
//!
//! [`DrillDownState`] is the navigation state machine; [`build_dataset`]
//! recomputes the chart dataset for the current scope from scratch on
//! every transition.

use crate::analysis::aggregator::{executive_weighted_nap, group_by_dimension};
use crate::models::{Dimension, Record};
use serde::Serialize;
use std::fmt;

/// Depth of the drill-down chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillLevel {
    Clinic,
    Team,
    Executive,
}

impl DrillLevel {
    /// Dimension shown on the chart at this level.
    pub fn dimension(&self) -> Dimension {
        match self {
            DrillLevel::Clinic => Dimension::Clinic,
            DrillLevel::Team => Dimension::Team,
            DrillLevel::Executive => Dimension::Executive,
        }
    }

    /// Color scale endpoints, from the lowest to the highest value.
    fn palette(&self) -> (Rgb, Rgb) {
        match self {
            DrillLevel::Clinic => (Rgb(191, 219, 254), Rgb(30, 64, 175)),
            DrillLevel::Team => (Rgb(167, 243, 208), Rgb(4, 120, 87)),
            DrillLevel::Executive => (Rgb(253, 230, 138), Rgb(180, 83, 9)),
        }
    }
}

/// Navigation state of the drill-down chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrillDownState {
    level: DrillLevel,
    selected_clinic: Option<String>,
    selected_team: Option<String>,
}

impl Default for DrillDownState {
    fn default() -> Self {
        Self::new()
    }
}

impl DrillDownState {
    /// Initial state: clinic level, nothing selected.
    pub fn new() -> Self {
        Self {
            level: DrillLevel::Clinic,
            selected_clinic: None,
            selected_team: None,
        }
    }

    pub fn level(&self) -> DrillLevel {
        self.level
    }

    #[allow(dead_code)] // Inspection accessor
    pub fn selected_clinic(&self) -> Option<&str> {
        self.selected_clinic.as_deref()
    }

    #[allow(dead_code)] // Inspection accessor
    pub fn selected_team(&self) -> Option<&str> {
        self.selected_team.as_deref()
    }

    /// Click on an item of the current level.
    ///
    /// Returns `false` at the executive level, which has no further drill.
    pub fn select(&mut self, key: &str) -> bool {
        match self.level {
            DrillLevel::Clinic => {
                self.selected_clinic = Some(key.to_string());
                self.level = DrillLevel::Team;
                true
            }
            DrillLevel::Team => {
                self.selected_team = Some(key.to_string());
                self.level = DrillLevel::Executive;
                true
            }
            DrillLevel::Executive => false,
        }
    }

    /// Go up one level, clearing the most specific selection.
    ///
    /// Returns `false` at the clinic level.
    pub fn back(&mut self) -> bool {
        match self.level {
            DrillLevel::Clinic => false,
            DrillLevel::Team => {
                self.selected_clinic = None;
                self.level = DrillLevel::Clinic;
                true
            }
            DrillLevel::Executive => {
                self.selected_team = None;
                self.level = DrillLevel::Team;
                true
            }
        }
    }

    /// Whether a record falls inside the current scope.
    pub fn contains(&self, record: &Record) -> bool {
        let clinic_ok = self
            .selected_clinic
            .as_deref()
            .map_or(true, |c| record.clinic == c);
        let team_ok = self
            .selected_team
            .as_deref()
            .map_or(true, |t| record.team == t);
        clinic_ok && team_ok
    }

    /// Path from the top level to the current scope.
    pub fn breadcrumbs(&self) -> Vec<String> {
        let mut crumbs = vec!["All clinics".to_string()];
        crumbs.extend(self.selected_clinic.iter().cloned());
        crumbs.extend(self.selected_team.iter().cloned());
        crumbs
    }
}

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Linear interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(from: Rgb, to: Rgb, t: f64) -> Rgb {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let channel = |a: u8, b: u8| -> u8 {
            (a as f64 + (b as f64 - a as f64) * t).round() as u8
        };
        Rgb(
            channel(from.0, to.0),
            channel(from.1, to.1),
            channel(from.2, to.2),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One bar of the drill-down chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillItem {
    pub label: String,
    /// Executive-weighted average NAP at this scope.
    pub value: f64,
    pub executive_count: usize,
    /// `value / max(value)` within the current scope.
    pub intensity: f64,
    pub color: Rgb,
}

/// Chart dataset for the current drill-down scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillDataset {
    pub level: DrillLevel,
    pub breadcrumbs: Vec<String>,
    pub items: Vec<DrillItem>,
    /// Whether clicking an item drills further.
    pub can_drill: bool,
}

impl DrillDataset {
    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.label.as_str()).collect()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.items.iter().any(|i| i.label == label)
    }
}

/// Recompute the dataset for `state` over `records`.
///
/// Clinic and team levels show the two-stage executive-weighted NAP
/// average; the executive level shows each executive's mean NAP per
/// record. Items are sorted by label.
pub fn build_dataset(state: &DrillDownState, records: &[Record]) -> DrillDataset {
    let level = state.level();
    let scoped: Vec<&Record> = records.iter().filter(|r| state.contains(r)).collect();

    let mut values: Vec<(String, f64, usize)> = match level {
        DrillLevel::Clinic | DrillLevel::Team => {
            executive_weighted_nap(scoped.iter().copied(), level.dimension())
                .into_iter()
                .map(|(label, avg)| (label, avg.average_nap, avg.executive_count))
                .collect()
        }
        DrillLevel::Executive => group_by_dimension(scoped.iter().copied(), Dimension::Executive)
            .into_iter()
            .map(|(label, acc)| (label, acc.mean_nap(), 1))
            .collect(),
    };
    values.sort_by(|a, b| a.0.cmp(&b.0));

    let max = values.iter().map(|v| v.1).fold(0.0_f64, f64::max);
    let (low, high) = level.palette();

    let items = values
        .into_iter()
        .map(|(label, value, executive_count)| {
            let intensity = if max > 0.0 { value / max } else { 0.0 };
            DrillItem {
                label,
                value,
                executive_count,
                intensity,
                color: Rgb::lerp(low, high, intensity),
            }
        })
        .collect();

    DrillDataset {
        level,
        breadcrumbs: state.breadcrumbs(),
        items,
        can_drill: level != DrillLevel::Executive,
    }
}
