//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.napboard.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".napboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Spreadsheet source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Alert thresholds and goals.
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "napboard_report.md".to_string()
}

/// Where records come from and how sheet columns map to fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Spreadsheet identifier.
    #[serde(default)]
    pub sheet_id: Option<String>,

    /// Sheet (tab) name.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Base URL of the spreadsheet service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Year assigned to rows without one.
    #[serde(default = "default_year")]
    pub default_year: i32,

    /// Column positions.
    #[serde(default)]
    pub columns: ColumnLayout,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            sheet_name: default_sheet_name(),
            base_url: default_base_url(),
            default_year: default_year(),
            columns: ColumnLayout::default(),
        }
    }
}

fn default_sheet_name() -> String {
    "Resumen".to_string()
}

fn default_base_url() -> String {
    "https://docs.google.com/spreadsheets/d".to_string()
}

fn default_year() -> i32 {
    2025
}

/// Zero-based column index of each record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub clinic: usize,
    pub executive: usize,
    pub team: usize,
    pub retention: usize,
    pub nap: usize,
    pub deals: usize,
    pub month: usize,
    pub year: usize,
    /// Only present in newer sheet layouts.
    pub coordinator: Option<usize>,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            clinic: 0,
            executive: 1,
            team: 2,
            retention: 3,
            nap: 4,
            deals: 5,
            month: 6,
            year: 7,
            coordinator: None,
        }
    }
}

/// Alert thresholds, ranking sizes and personal goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Retention below this raises an alert on the general dashboard.
    #[serde(default = "default_alert")]
    pub alert: f64,

    /// Retention below this raises an alert on the retention view.
    #[serde(default = "default_retention_alert")]
    pub retention_alert: f64,

    /// Alerts below this are critical.
    #[serde(default = "default_critical")]
    pub critical: f64,

    /// Size of the health ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Size of the per-team top performer list.
    #[serde(default = "default_team_top_n")]
    pub team_top_n: usize,

    /// Personal NAP goal.
    #[serde(default = "default_nap_goal")]
    pub nap_goal: f64,

    /// Personal minimum retention goal.
    #[serde(default = "default_retention_goal")]
    pub retention_goal: f64,

    /// NAP above `mean * high_factor` counts as high performance.
    #[serde(default = "default_high_factor")]
    pub high_factor: f64,

    /// NAP below `mean * low_factor` counts as low performance.
    #[serde(default = "default_low_factor")]
    pub low_factor: f64,

    /// Clinic retention at or above this is in the good band.
    #[serde(default = "default_band_good")]
    pub band_good: f64,

    /// Clinic retention at or above this (and below good) is a warning.
    #[serde(default = "default_band_warning")]
    pub band_warning: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            alert: default_alert(),
            retention_alert: default_retention_alert(),
            critical: default_critical(),
            top_n: default_top_n(),
            team_top_n: default_team_top_n(),
            nap_goal: default_nap_goal(),
            retention_goal: default_retention_goal(),
            high_factor: default_high_factor(),
            low_factor: default_low_factor(),
            band_good: default_band_good(),
            band_warning: default_band_warning(),
        }
    }
}

fn default_alert() -> f64 {
    70.0
}

fn default_retention_alert() -> f64 {
    80.0
}

fn default_critical() -> f64 {
    60.0
}

fn default_top_n() -> usize {
    10
}

fn default_team_top_n() -> usize {
    3
}

fn default_nap_goal() -> f64 {
    500.0
}

fn default_retention_goal() -> f64 {
    70.0
}

fn default_high_factor() -> f64 {
    1.2
}

fn default_low_factor() -> f64 {
    0.8
}

fn default_band_good() -> f64 {
    80.0
}

fn default_band_warning() -> f64 {
    60.0
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include chart datasets in the report.
    #[serde(default = "default_true")]
    pub include_charts: bool,

    /// Include the alert section on the executive view.
    #[serde(default = "default_true")]
    pub include_alerts: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_charts: true,
            include_alerts: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.napboard.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref sheet_id) = args.sheet_id {
            self.source.sheet_id = Some(sheet_id.clone());
        }
        if let Some(ref sheet_name) = args.sheet_name {
            self.source.sheet_name = sheet_name.clone();
        }

        if let Some(threshold) = args.threshold {
            self.thresholds.alert = threshold;
            self.thresholds.retention_alert = threshold;
        }
        if let Some(top_n) = args.top_n {
            self.thresholds.top_n = top_n;
        }

        if args.no_charts {
            self.report.include_charts = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.sheet_name, "Resumen");
        assert_eq!(config.source.default_year, 2025);
        assert_eq!(config.thresholds.alert, 70.0);
        assert_eq!(config.thresholds.retention_alert, 80.0);
        assert_eq!(config.thresholds.top_n, 10);
        assert_eq!(config.source.columns.month, 6);
        assert!(config.source.columns.coordinator.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "weekly.md"
verbose = true

[source]
sheet_id = "abc123"

[source.columns]
coordinator = 8

[thresholds]
alert = 75.0
top_n = 5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "weekly.md");
        assert!(config.general.verbose);
        assert_eq!(config.source.sheet_id.as_deref(), Some("abc123"));
        assert_eq!(config.source.sheet_name, "Resumen");
        assert_eq!(config.source.columns.coordinator, Some(8));
        assert_eq!(config.source.columns.clinic, 0);
        assert_eq!(config.thresholds.alert, 75.0);
        assert_eq!(config.thresholds.retention_alert, 80.0);
        assert_eq!(config.thresholds.top_n, 5);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[thresholds]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.thresholds, ThresholdConfig::default());
    }

    #[test]
    fn test_load_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).unwrap().is_none());

        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            "[thresholds]\ncritical = 50.0\n",
        )
        .unwrap();
        let config = Config::load_from_dir(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.thresholds.critical, 50.0);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "[thresholds\n").unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).is_err());
    }
}
