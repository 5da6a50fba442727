//! napboard - sales performance dashboards from a shared spreadsheet
//!
//! A CLI tool that fetches the NAP/retention summary sheet, aggregates it
//! by executive, team, clinic and coordinator, and renders one dashboard
//! view as a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (fetch failure, unreadable payload, bad drill path, etc.)

mod analysis;
mod cli;
mod config;
mod dashboard;
mod drilldown;
mod models;
mod report;
mod source;

use analysis::aggregator::{affiliation_conflicts, distinct_sorted};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat, ViewArg, DRILL_BACK};
use config::{Config, CONFIG_FILE};
use dashboard::{Dashboard, DashboardView, Selection};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Dimension, Record, Report, ReportMetadata, ViewKind};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `[general] verbose` applies
    let config = match load_config(&args) {
        Ok(mut config) => {
            config.merge_with_args(&args);
            config
        }
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&args, &config);

    info!("napboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run_dashboard(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Dashboard failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .napboard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the sheet id, column layout, thresholds and goals.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

fn view_kind(view: ViewArg) -> ViewKind {
    match view {
        ViewArg::Executive => ViewKind::Executive,
        ViewArg::Operational => ViewKind::Operational,
        ViewArg::Individual => ViewKind::Individual,
        ViewArg::Retention => ViewKind::Retention,
        ViewArg::Drilldown => ViewKind::DrillDown,
    }
}

/// Run the complete dashboard workflow. Returns the exit code.
async fn run_dashboard(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    // Step 1: Load the records
    let (source_label, records) = load_records(&args, &config).await?;
    println!("📥 Loaded {} records from {}", records.len(), source_label);

    if args.dry_run {
        return handle_dry_run(&records);
    }

    // Step 2: Build the dashboard and apply selections
    let mut dashboard = Dashboard::new(records, config.thresholds.clone());

    if let Some(ref coordinator) = args.coordinator {
        dashboard.apply_filter(Dimension::Coordinator, coordinator);
    }

    let kind = view_kind(args.view);
    let selection = Selection {
        team: args.team.clone(),
        executive: args.executive.clone(),
    };

    if let Some(ref team) = selection.team {
        if !dashboard.filter_options().teams.contains(team) {
            warn!("Team '{}' has no records", team);
        }
    }

    let mut view = dashboard.show(kind, &selection);

    if kind == ViewKind::DrillDown {
        for step in args.drill_steps() {
            if step.eq_ignore_ascii_case(DRILL_BACK) {
                if !dashboard.drill_back() {
                    debug!("Already at the top drill-down level");
                }
            } else {
                dashboard
                    .drill_select(&step)
                    .with_context(|| format!("Invalid drill-down step '{}'", step))?;
            }
        }
        view = DashboardView::DrillDown(dashboard.drill_dataset());
    }

    // Step 3: Build the report
    let metadata = ReportMetadata {
        source: source_label,
        generated_at: Utc::now(),
        record_count: dashboard.records().len(),
        view: kind,
        filters: dashboard.filter_descriptions(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let report = Report {
        metadata,
        view,
        charts: if config.report.include_charts {
            dashboard.charts().entries()
        } else {
            Vec::new()
        },
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.general.output));
    report::write_report(&output, &output_path)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 {} view", report.view.kind());
    println!("   Records: {}", report.metadata.record_count);
    if let DashboardView::Pending { ref prompt, .. } = report.view {
        println!("   ℹ️  {}", prompt);
    }
    let (alert_count, alert_threshold) = dashboard.alert_summary(&report.view);
    println!("   Alerts (below {:.0}%): {}", alert_threshold, alert_count);
    println!("   Charts: {}", report.charts.len());
    debug!(
        "{} chart(s) live, {} disposed during this run",
        dashboard.charts().len(),
        dashboard.charts().disposed_count()
    );
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(0)
}

/// Fetch or read the payload and parse it into records.
///
/// Returns a label describing the source along with the records.
async fn load_records(args: &Args, config: &Config) -> Result<(String, Vec<Record>)> {
    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let (label, payload) = if let Some(ref input) = args.input {
        if let Some(ref pb) = spinner {
            pb.set_message(format!("Reading {}...", input.display()));
        }
        let payload = source::load_file(input).await;
        (input.display().to_string(), payload)
    } else {
        let sheet = match source::SheetSource::from_config(&config.source) {
            Ok(sheet) => sheet,
            Err(_) => {
                if let Some(pb) = spinner {
                    pb.finish_and_clear();
                }
                bail!("No spreadsheet configured: pass --sheet-id, set NAPBOARD_SHEET_ID, or use --input");
            }
        };
        let url = sheet.export_url()?.to_string();
        if let Some(ref pb) = spinner {
            pb.set_message(format!("Fetching sheet '{}'...", config.source.sheet_name));
        }
        (url, sheet.fetch().await)
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let payload = payload.context("Failed to load spreadsheet data")?;
    let records = source::parse_records(
        &payload,
        &config.source.columns,
        config.source.default_year,
    )
    .context("Failed to parse spreadsheet data")?;

    info!("Parsed {} records", records.len());
    Ok((label, records))
}

/// Handle --dry-run: summarize the parsed records and exit.
fn handle_dry_run(records: &[Record]) -> Result<i32> {
    println!("\n🔍 Dry run: records parsed, no report written.\n");

    let clinics = distinct_sorted(records, Dimension::Clinic);
    let teams = distinct_sorted(records, Dimension::Team);
    let executives = distinct_sorted(records, Dimension::Executive);
    let coordinators = distinct_sorted(records, Dimension::Coordinator);
    let with_retention = records.iter().filter(|r| r.retention.is_some()).count();
    let without_month = records.iter().filter(|r| r.month.is_none()).count();

    println!("   Records: {}", records.len());
    println!("   With retention: {}", with_retention);
    if without_month > 0 {
        println!("   ⚠️  Without a recognized month: {}", without_month);
    }
    println!("   Clinics ({}): {}", clinics.len(), clinics.join(", "));
    println!("   Teams ({}): {}", teams.len(), teams.join(", "));
    println!("   Executives: {}", executives.len());
    if !coordinators.is_empty() {
        println!("   Coordinators ({}): {}", coordinators.len(), coordinators.join(", "));
    }
    let conflicts = affiliation_conflicts(records);
    if !conflicts.is_empty() {
        println!("   ⚠️  Executives in more than one team or clinic: {}", conflicts.join(", "));
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so problems go to stderr directly.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
