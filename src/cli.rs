//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// napboard - sales performance dashboards from a shared spreadsheet
///
/// Fetches the summary sheet, aggregates NAP, retention and deals by
/// executive, team, clinic and coordinator, and renders one dashboard
/// view as a Markdown or JSON report.
///
/// Examples:
///   napboard --sheet-id 1AbC... --view executive
///   napboard --input saved.json --view operational --team "Equipo A"
///   napboard --input saved.json --view drilldown --drill "Clinica Norte,Equipo A"
///   napboard --sheet-id 1AbC... --view retention --format json
///   napboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Spreadsheet identifier
    ///
    /// Can also be set via NAPBOARD_SHEET_ID env var or .napboard.toml config.
    #[arg(long, value_name = "ID", env = "NAPBOARD_SHEET_ID")]
    pub sheet_id: Option<String>,

    /// Sheet (tab) to read
    ///
    /// Default: from config or "Resumen".
    #[arg(long, value_name = "NAME")]
    pub sheet_name: Option<String>,

    /// Read a saved export payload instead of fetching the sheet
    ///
    /// Takes precedence over --sheet-id.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Dashboard view to render
    #[arg(long, default_value = "executive", value_name = "VIEW")]
    pub view: ViewArg,

    /// Team for the operational view
    #[arg(short, long, value_name = "TEAM")]
    pub team: Option<String>,

    /// Executive for the individual view
    #[arg(short, long, value_name = "NAME")]
    pub executive: Option<String>,

    /// Restrict every view to one coordinator's records
    #[arg(long, value_name = "NAME")]
    pub coordinator: Option<String>,

    /// Drill-down clicks, applied in order (comma-separated)
    ///
    /// Each entry selects an item at the current level; "back" goes up.
    /// Example: --drill "Clinica Norte,Equipo A,back"
    #[arg(long, value_name = "PATH", value_delimiter = ',')]
    pub drill: Option<Vec<String>>,

    /// Retention alert threshold in percent
    ///
    /// Overrides both the general and the retention view thresholds.
    #[arg(long, value_name = "PERCENT")]
    pub threshold: Option<f64>,

    /// Number of executives in the health ranking
    #[arg(long, value_name = "COUNT")]
    pub top_n: Option<usize>,

    /// Leave chart datasets out of the report
    #[arg(long)]
    pub no_charts: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report
    ///
    /// Default: from config or napboard_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .napboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load and parse the records, print a summary and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .napboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Value of --view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ViewArg {
    /// General dashboard: KPIs, rankings, clinic retention, alerts
    #[default]
    Executive,
    /// One team's executives (requires --team)
    Operational,
    /// One executive against the team and the whole sheet (requires --executive)
    Individual,
    /// Retention alerts grouped by coordinator
    Retention,
    /// Clinic -> team -> executive NAP chart
    Drilldown,
}

/// Drill path entry that goes up one level.
pub const DRILL_BACK: &str = "back";

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(threshold) = self.threshold {
            if !(0.0..=100.0).contains(&threshold) {
                return Err("Threshold must be between 0 and 100".to_string());
            }
        }

        if self.top_n == Some(0) {
            return Err("Top N must be at least 1".to_string());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        if let Some(ref steps) = self.drill {
            if steps.iter().any(|s| s.trim().is_empty()) {
                return Err("Drill path entries cannot be empty".to_string());
            }
            if self.view != ViewArg::Drilldown {
                return Err("--drill only applies to --view drilldown".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_by_default` comes from the config file; `--quiet` wins over it.
    pub fn log_level(&self, verbose_by_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_by_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Drill path with surrounding whitespace removed.
    pub fn drill_steps(&self) -> Vec<String> {
        self.drill
            .iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .collect()
    }
}
