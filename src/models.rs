//! Data models for the dashboard engine.
//!
//! This module contains the record type produced by the record source,
//! the small enums shared by the aggregation and view layers, and the
//! report envelope handed to the renderer.

use crate::dashboard::{ChartEntry, DashboardView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reporting month. Only the second half of the year is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Month {
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    /// All months in calendar order.
    pub const ALL: [Month; 7] = [
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Parse a month label as it appears in the spreadsheet.
    ///
    /// Accepts the Spanish labels used by the sheet (`JUNIO`, `JULIO`, ...)
    /// as well as English names, case-insensitively.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "JUNIO" | "JUNE" | "JUN" => Some(Month::June),
            "JULIO" | "JULY" | "JUL" => Some(Month::July),
            "AGOSTO" | "AUGUST" | "AGO" | "AUG" => Some(Month::August),
            "SEPTIEMBRE" | "SETIEMBRE" | "SEPTEMBER" | "SEP" => Some(Month::September),
            "OCTUBRE" | "OCTOBER" | "OCT" => Some(Month::October),
            "NOVIEMBRE" | "NOVEMBER" | "NOV" => Some(Month::November),
            "DICIEMBRE" | "DECEMBER" | "DIC" | "DEC" => Some(Month::December),
            _ => None,
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Month::June => write!(f, "JUNE"),
            Month::July => write!(f, "JULY"),
            Month::August => write!(f, "AUGUST"),
            Month::September => write!(f, "SEPTEMBER"),
            Month::October => write!(f, "OCTOBER"),
            Month::November => write!(f, "NOVEMBER"),
            Month::December => write!(f, "DECEMBER"),
        }
    }
}

/// One clinic/executive/month observation from the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub clinic: String,
    pub executive: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<String>,
    pub team: String,
    /// Retention rate in percent. `None` when the sheet reports 0.
    pub retention: Option<f64>,
    /// Net adjusted production.
    pub nap: f64,
    pub deals: f64,
    pub month: Option<Month>,
    pub year: i32,
}

impl Record {
    /// Map a raw retention cell to the optional model value.
    ///
    /// The sheet uses 0 as "not reported"; anything not strictly positive
    /// is treated the same way.
    pub fn retention_from_raw(raw: f64) -> Option<f64> {
        if raw > 0.0 {
            Some(raw)
        } else {
            None
        }
    }

    /// Key of this record along a grouping dimension.
    pub fn key(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Clinic => &self.clinic,
            Dimension::Team => &self.team,
            Dimension::Executive => &self.executive,
            Dimension::Coordinator => self.coordinator.as_deref().unwrap_or(""),
        }
    }
}

/// Grouping dimension for aggregates and selection events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Clinic,
    Team,
    Executive,
    Coordinator,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Clinic => write!(f, "Clinic"),
            Dimension::Team => write!(f, "Team"),
            Dimension::Executive => write!(f, "Executive"),
            Dimension::Coordinator => write!(f, "Coordinator"),
        }
    }
}

/// Which dashboard view to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Executive,
    Operational,
    Individual,
    Retention,
    DrillDown,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::Executive => write!(f, "Executive"),
            ViewKind::Operational => write!(f, "Operational"),
            ViewKind::Individual => write!(f, "Individual"),
            ViewKind::Retention => write!(f, "Retention"),
            ViewKind::DrillDown => write!(f, "Drill-down"),
        }
    }
}

/// Severity of a retention alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Below the alert threshold.
    Warning,
    /// Below the critical threshold as well.
    Critical,
}

impl AlertLevel {
    /// Returns an emoji representation of the level.
    pub fn emoji(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "🟡",
            AlertLevel::Critical => "🔴",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warning => write!(f, "Warning"),
            AlertLevel::Critical => write!(f, "Critical"),
        }
    }
}

/// Color band for a retention bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionBand {
    Good,
    Warning,
    Critical,
}

impl RetentionBand {
    /// Classify a retention value against the good/warning floors.
    pub fn classify(retention: f64, good_from: f64, warning_from: f64) -> Self {
        if retention >= good_from {
            RetentionBand::Good
        } else if retention >= warning_from {
            RetentionBand::Warning
        } else {
            RetentionBand::Critical
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RetentionBand::Good => "🟢",
            RetentionBand::Warning => "🟡",
            RetentionBand::Critical => "🔴",
        }
    }
}

/// Direction indicator for a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// Up for strictly positive differences, down otherwise.
    pub fn from_difference(difference: f64) -> Self {
        if difference > 0.0 {
            Trend::Up
        } else {
            Trend::Down
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
        }
    }
}

/// Status of a personal goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Success,
    Warning,
    Danger,
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalStatus::Success => write!(f, "Achieved"),
            GoalStatus::Warning => write!(f, "In progress"),
            GoalStatus::Danger => write!(f, "Needs improvement"),
        }
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the records came from (export URL or local file).
    pub source: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of records after filtering.
    pub record_count: usize,
    /// View rendered in this report.
    pub view: ViewKind,
    /// Active filters, as `dimension = key` strings.
    pub filters: Vec<String>,
    /// Time spent loading and computing, in seconds.
    pub duration_seconds: f64,
}

/// A rendered dashboard view plus its chart datasets.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub view: DashboardView,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<ChartEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_ordering() {
        assert!(Month::June < Month::July);
        assert!(Month::November < Month::December);
        assert_eq!(Month::ALL.first(), Some(&Month::June));
        assert_eq!(Month::ALL.last(), Some(&Month::December));
    }

    #[test]
    fn test_month_parse() {
        assert_eq!(Month::parse("JUNIO"), Some(Month::June));
        assert_eq!(Month::parse("septiembre"), Some(Month::September));
        assert_eq!(Month::parse(" December "), Some(Month::December));
        assert_eq!(Month::parse("ENERO"), None);
        assert_eq!(Month::parse(""), None);
    }

    #[test]
    fn test_retention_from_raw() {
        assert_eq!(Record::retention_from_raw(80.0), Some(80.0));
        assert_eq!(Record::retention_from_raw(0.0), None);
        assert_eq!(Record::retention_from_raw(-5.0), None);
    }

    #[test]
    fn test_retention_band() {
        assert_eq!(RetentionBand::classify(85.0, 80.0, 60.0), RetentionBand::Good);
        assert_eq!(RetentionBand::classify(80.0, 80.0, 60.0), RetentionBand::Good);
        assert_eq!(RetentionBand::classify(65.0, 80.0, 60.0), RetentionBand::Warning);
        assert_eq!(RetentionBand::classify(59.9, 80.0, 60.0), RetentionBand::Critical);
    }

    #[test]
    fn test_trend_from_difference() {
        assert_eq!(Trend::from_difference(3.5), Trend::Up);
        assert_eq!(Trend::from_difference(-0.1), Trend::Down);
        assert_eq!(Trend::from_difference(0.0), Trend::Down);
    }

    #[test]
    fn test_record_key_coordinator_missing() {
        let record = Record {
            clinic: "Norte".to_string(),
            executive: "Ana".to_string(),
            coordinator: None,
            team: "T1".to_string(),
            retention: None,
            nap: 0.0,
            deals: 0.0,
            month: None,
            year: 2025,
        };
        assert_eq!(record.key(Dimension::Coordinator), "");
        assert_eq!(record.key(Dimension::Clinic), "Norte");
    }
}
