//! Markdown and JSON report generation.
//!
//! This module renders a computed dashboard view as a Markdown report,
//! one section per panel of the view, or as pretty-printed JSON.

use crate::analysis::aggregator::MonthlyPoint;
use crate::analysis::comparison::{Delta, PeerComparison};
use crate::analysis::ranking::{RankedExecutive, RetentionAlert};
use crate::config::ReportConfig;
use crate::dashboard::views::{ExecutiveView, IndividualView, OperationalView, RetentionView};
use crate::dashboard::{ChartEntry, DashboardView};
use crate::drilldown::DrillDataset;
use crate::models::{Report, ReportMetadata};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# NAP Dashboard: {} view\n\n", report.metadata.view));

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // View body
    output.push_str(&match &report.view {
        DashboardView::Executive(view) => generate_executive_section(view, options),
        DashboardView::Operational(view) => generate_operational_section(view),
        DashboardView::Individual(view) => generate_individual_section(view),
        DashboardView::Retention(view) => generate_retention_section(view),
        DashboardView::DrillDown(dataset) => generate_drilldown_section(dataset),
        DashboardView::Pending { prompt, .. } => format!("> ℹ️ {}\n\n", prompt),
    });

    // Chart datasets
    if options.include_charts {
        output.push_str(&generate_charts_section(&report.charts));
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Records:** {}\n", metadata.record_count));
    section.push_str(&format!("- **View:** {}\n", metadata.view));
    if !metadata.filters.is_empty() {
        section.push_str(&format!("- **Filters:** {}\n", metadata.filters.join(", ")));
    }
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Format an amount with thousands separators and no decimals.
pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Format an optional percentage, "n/a" when absent.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "n/a".to_string(),
    }
}

/// Format a delta with its trend arrow; `unit` follows the number.
pub fn format_delta(delta: &Delta, unit: &str) -> String {
    match delta {
        Delta::Change { value, trend } => format!("{} {:+.1}{}", trend.arrow(), value, unit),
        Delta::NoBaseline => "n/a (no baseline)".to_string(),
    }
}

fn generate_ranking_table(ranking: &[RankedExecutive]) -> String {
    let mut table = String::new();

    table.push_str("| # | Executive | Team | Total NAP | Avg NAP | Retention | Health |\n");
    table.push_str("|---:|:---|:---|---:|---:|---:|---:|\n");
    for (i, r) in ranking.iter().enumerate() {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.1}% | {} |\n",
            i + 1,
            r.executive,
            r.team,
            format_amount(r.total_nap),
            format_amount(r.average_nap),
            r.average_retention,
            format_amount(r.health_index)
        ));
    }
    table.push('\n');

    table
}

/// Generate the alert list, or the explicit all-clear line.
fn generate_alerts_section(alerts: &[RetentionAlert], threshold: f64) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "### ⚠️ Retention Alerts (below {:.0}%)\n\n",
        threshold
    ));

    if alerts.is_empty() {
        section.push_str("No executives need attention. ✅\n\n");
        return section;
    }

    section.push_str(
        "| Level | Executive | Team | Clinic | Retention | NAP at risk | NAP / month | Deals / month |\n",
    );
    section.push_str("|:---:|:---|:---|:---|---:|---:|---:|---:|\n");
    for alert in alerts {
        section.push_str(&format!(
            "| {} {} | {} | {} | {} | {:.1}% | {} | {} | {:.1} |\n",
            alert.level.emoji(),
            alert.level,
            alert.executive,
            alert.team,
            alert.clinic,
            alert.retention,
            format_amount(alert.risk_amount),
            format_amount(alert.monthly_nap),
            alert.monthly_deals
        ));
    }
    section.push('\n');

    section
}

fn generate_monthly_table(monthly: &[MonthlyPoint]) -> String {
    let mut table = String::new();

    table.push_str("| Month | NAP | Retention | Deals |\n");
    table.push_str("|:---|---:|---:|---:|\n");
    for point in monthly {
        table.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            point.month,
            format_amount(point.nap),
            format_percent(point.retention),
            point.deals
        ));
    }
    table.push('\n');

    table
}

/// Generate the general dashboard body.
fn generate_executive_section(view: &ExecutiveView, options: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str("| Total NAP | Avg Retention | NAP / Deal | Executives |\n");
    section.push_str("|---:|---:|---:|---:|\n");
    section.push_str(&format!(
        "| {} | {:.1}% | {} | {} |\n\n",
        format_amount(view.kpis.total_nap),
        view.kpis.average_retention,
        format_amount(view.kpis.nap_per_deal),
        view.kpis.executive_count
    ));

    if !view.retention_evolution.is_empty() {
        section.push_str("### Retention Evolution by Team\n\n");
        section.push_str("| Team |");
        for month in &view.months {
            section.push_str(&format!(" {} |", month));
        }
        section.push_str("\n|:---|");
        section.push_str(&"---:|".repeat(view.months.len()));
        section.push('\n');
        for team in &view.retention_evolution {
            section.push_str(&format!("| {} |", team.team));
            for value in &team.values {
                section.push_str(&format!(" {} |", format_percent(*value)));
            }
            section.push('\n');
        }
        section.push('\n');
    }

    section.push_str(&format!(
        "### 🏆 Top {} by Health Index\n\n",
        view.health_ranking.len()
    ));
    if view.health_ranking.is_empty() {
        section.push_str("No executives report retention yet.\n\n");
    } else {
        section.push_str(&generate_ranking_table(&view.health_ranking));
    }

    if !view.retention_by_clinic.is_empty() {
        section.push_str("### Retention by Clinic\n\n");
        section.push_str("| Clinic | Retention | Band |\n");
        section.push_str("|:---|---:|:---:|\n");
        for clinic in &view.retention_by_clinic {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                clinic.clinic,
                format_percent(clinic.retention),
                clinic.band.map_or("⚪", |b| b.emoji())
            ));
        }
        section.push('\n');
    }

    if options.include_alerts {
        section.push_str(&generate_alerts_section(&view.alerts, view.alert_threshold));
    }

    section
}

/// Generate the team body.
fn generate_operational_section(view: &OperationalView) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Team {}\n\n", view.team));
    section.push_str("| Total NAP | Avg Retention | Executives |\n");
    section.push_str("|---:|---:|---:|\n");
    section.push_str(&format!(
        "| {} | {:.1}% | {} |\n\n",
        format_amount(view.kpis.total_nap),
        view.kpis.average_retention,
        view.kpis.executive_count
    ));

    section.push_str("### Executives\n\n");
    if view.executives.is_empty() {
        section.push_str("No records for this team.\n\n");
    } else {
        section.push_str(
            "| Executive | Clinic | NAP | Retention | Deals | NAP / Deal | Health |\n",
        );
        section.push_str("|:---|:---|---:|---:|---:|---:|---:|\n");
        for row in &view.executives {
            section.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                row.executive,
                row.clinic,
                format_amount(row.total_nap),
                format_percent(row.average_retention),
                row.deals,
                format_amount(row.nap_per_deal),
                format_amount(row.health_index)
            ));
        }
        section.push('\n');
    }

    if !view.top_performers.is_empty() {
        section.push_str("### Top Performers (average NAP)\n\n");
        section.push_str(&generate_ranking_table(&view.top_performers));
    }

    section.push_str("### Monthly Evolution\n\n");
    section.push_str(&generate_monthly_table(&view.monthly));

    section.push_str("### Performance Distribution\n\n");
    section.push_str(&format!(
        "- 🟢 High: {}\n- 🟡 Normal: {}\n- 🔴 Low: {}\n\n",
        view.distribution.high, view.distribution.normal, view.distribution.low
    ));

    section
}

fn generate_peer_section(peers: &PeerComparison) -> String {
    let mut section = String::new();

    section.push_str(&format!("### Versus Team {}\n\n", peers.team));
    match &peers.peers {
        None => {
            section.push_str("No teammates to compare with.\n\n");
        }
        Some(baseline) => {
            section.push_str(&format!(
                "Compared with {} teammate(s).\n\n",
                baseline.peer_count
            ));
            section.push_str("| Metric | Mine | Team Avg | Delta |\n");
            section.push_str("|:---|---:|---:|---:|\n");
            section.push_str(&format!(
                "| NAP | {} | {} | {} |\n",
                format_amount(peers.mine.nap),
                format_amount(baseline.averages.nap),
                format_delta(&peers.nap_delta, "%")
            ));
            section.push_str(&format!(
                "| Retention | {:.1}% | {:.1}% | {} |\n",
                peers.mine.retention,
                baseline.averages.retention,
                format_delta(&peers.retention_delta, "%")
            ));
            section.push_str(&format!(
                "| Deals | {} | {:.1} | {} |\n\n",
                peers.mine.deals,
                baseline.averages.deals,
                format_delta(&peers.deals_delta, "%")
            ));
        }
    }

    section
}

/// Generate the individual body.
fn generate_individual_section(view: &IndividualView) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "## {} ({}, {})\n\n",
        view.executive, view.team, view.clinic
    ));
    section.push_str("| NAP | Retention | Deals |\n");
    section.push_str("|---:|---:|---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} |\n\n",
        format_amount(view.kpis.nap),
        format_percent(view.kpis.retention),
        view.kpis.deals
    ));

    section.push_str("### Versus All Executives\n\n");
    section.push_str(&format!(
        "- **NAP:** {} vs average {}\n",
        format_delta(&view.versus_overall.nap_delta, "%"),
        format_amount(view.versus_overall.average_nap)
    ));
    section.push_str(&format!(
        "- **Retention:** {} vs average {:.1}%\n\n",
        format_delta(&view.versus_overall.retention_delta, " pts"),
        view.versus_overall.average_retention
    ));

    section.push_str(&generate_peer_section(&view.peers));

    section.push_str("### Monthly Performance\n\n");
    section.push_str(&generate_monthly_table(&view.monthly));

    section.push_str("### 🎯 Goals\n\n");
    section.push_str(&format!(
        "- **NAP goal {}:** {:.0}% ({})\n",
        format_amount(view.goals.nap.goal),
        view.goals.nap.progress,
        view.goals.nap.status
    ));
    section.push_str(&format!(
        "- **Retention goal {:.0}%:** {:.0}% {}\n\n",
        view.goals.retention.goal,
        view.goals.retention.progress,
        if view.goals.retention.met { "✅" } else { "❌" }
    ));

    section
}

/// Generate the retention body.
fn generate_retention_section(view: &RetentionView) -> String {
    let mut section = String::new();

    section.push_str("## Retention\n\n");
    section.push_str(&format!(
        "- **Flagged executives:** {}\n- **Total NAP at risk:** {}\n\n",
        view.alerts.len(),
        format_amount(view.total_risk)
    ));

    section.push_str(&generate_alerts_section(&view.alerts, view.threshold));

    if !view.coordinators.is_empty() {
        section.push_str("### By Coordinator\n\n");
        section.push_str("| Coordinator | Retention | NAP | Flagged |\n");
        section.push_str("|:---|---:|---:|---:|\n");
        for c in &view.coordinators {
            section.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                c.coordinator,
                format_percent(c.average_retention),
                format_amount(c.total_nap),
                c.flagged
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the drill-down body.
fn generate_drilldown_section(dataset: &DrillDataset) -> String {
    let mut section = String::new();

    section.push_str("## NAP Drill-down\n\n");
    section.push_str(&format!("**Path:** {}\n\n", dataset.breadcrumbs.join(" › ")));

    if dataset.items.is_empty() {
        section.push_str("No records in this scope.\n\n");
        return section;
    }

    section.push_str("| Item | Avg NAP | Executives | Intensity | Color |\n");
    section.push_str("|:---|---:|---:|---:|:---|\n");
    for item in &dataset.items {
        section.push_str(&format!(
            "| {} | {} | {} | {:.0}% | `{}` |\n",
            item.label,
            format_amount(item.value),
            item.executive_count,
            item.intensity * 100.0,
            item.color
        ));
    }
    section.push('\n');

    if !dataset.can_drill {
        section.push_str("*Executive level reached.*\n\n");
    }

    section
}

/// Generate the chart dataset appendix.
fn generate_charts_section(charts: &[ChartEntry]) -> String {
    if charts.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Chart Data\n\n");

    for chart in charts {
        section.push_str(&format!("### {} ({:?})\n\n", chart.id, chart.data.kind));
        section.push_str("| Label |");
        for series in &chart.data.series {
            section.push_str(&format!(" {} |", series.name));
        }
        section.push_str("\n|:---|");
        section.push_str(&"---:|".repeat(chart.data.series.len()));
        section.push('\n');

        for (i, label) in chart.data.labels.iter().enumerate() {
            section.push_str(&format!("| {} |", label));
            for series in &chart.data.series {
                let cell = match series.values.get(i).copied().flatten() {
                    Some(v) => format!("{:.1}", v),
                    None => "-".to_string(),
                };
                section.push_str(&format!(" {} |", cell));
            }
            section.push('\n');
        }
        section.push('\n');
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by napboard*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::{record, scenario_records};
    use crate::config::ThresholdConfig;
    use crate::dashboard::{Dashboard, Selection};
    use crate::models::{Month, ViewKind};
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_report(kind: ViewKind, selection: &Selection) -> Report {
        let mut dashboard = Dashboard::new(
            vec![
                record("Ana", "T1", "Norte", 1500.0, 90.0, 3.0, Some(Month::June)),
                record("Beto", "T1", "Sur", 200.0, 55.0, 1.0, Some(Month::June)),
                record("Caro", "T2", "Sur", 800.0, 0.0, 2.0, Some(Month::July)),
            ],
            ThresholdConfig::default(),
        );
        let view = dashboard.show(kind, selection);

        Report {
            metadata: ReportMetadata {
                source: "test.json".to_string(),
                generated_at: Utc::now(),
                record_count: dashboard.records().len(),
                view: kind,
                filters: vec![],
                duration_seconds: 0.5,
            },
            view,
            charts: dashboard.charts().entries(),
        }
    }

    #[test]
    fn test_generate_executive_report() {
        let report = create_test_report(ViewKind::Executive, &Selection::default());
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# NAP Dashboard: Executive view"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("| 2,500 |"));
        assert!(markdown.contains("Top 2 by Health Index"));
        assert!(markdown.contains("Retention Alerts"));
        assert!(markdown.contains("| 🔴 Critical | Beto |"));
        assert!(markdown.contains("## Chart Data"));
    }

    #[test]
    fn test_report_options() {
        let report = create_test_report(ViewKind::Executive, &Selection::default());
        let options = ReportConfig {
            include_charts: false,
            include_alerts: false,
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(!markdown.contains("## Chart Data"));
        assert!(!markdown.contains("Retention Alerts"));
    }

    #[test]
    fn test_empty_alert_list_renders_all_clear() {
        let section = generate_alerts_section(&[], 70.0);
        assert!(section.contains("No executives need attention"));
    }

    #[test]
    fn test_pending_view_renders_prompt() {
        let report = create_test_report(ViewKind::Operational, &Selection::default());
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("Select a team"));
        assert!(!markdown.contains("## Chart Data"));
    }

    #[test]
    fn test_individual_report() {
        let selection = Selection {
            team: None,
            executive: Some("Ana".to_string()),
        };
        let report = create_test_report(ViewKind::Individual, &selection);
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("## Ana (T1, Norte)"));
        assert!(markdown.contains("Compared with 1 teammate(s)"));
        assert!(markdown.contains("### 🎯 Goals"));
    }

    #[test]
    fn test_retention_report() {
        let mut dashboard = Dashboard::new(scenario_records(), ThresholdConfig::default());
        let view = dashboard.show(ViewKind::Retention, &Selection::default());
        let section = match &view {
            DashboardView::Retention(v) => generate_retention_section(v),
            other => panic!("unexpected view {:?}", other.kind()),
        };

        assert!(section.contains("below 80%"));
        assert!(section.contains("| B |"));
        assert!(section.contains("Unassigned"));
    }

    #[test]
    fn test_drilldown_report() {
        let report = create_test_report(ViewKind::DrillDown, &Selection::default());
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("**Path:** All clinics"));
        assert!(markdown.contains("| Norte |"));
        assert!(markdown.contains("rgb("));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.4), "999");
        assert_eq!(format_amount(1234567.0), "1,234,567");
        assert_eq!(format_amount(-1500.0), "-1,500");
        assert_eq!(format_percent(Some(72.345)), "72.3%");
        assert_eq!(format_percent(None), "n/a");
        assert_eq!(format_delta(&Delta::percent(150.0, 100.0), "%"), "▲ +50.0%");
        assert_eq!(format_delta(&Delta::NoBaseline, "%"), "n/a (no baseline)");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report(ViewKind::Executive, &Selection::default());
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"view\": \"executive\""));
        assert!(json.contains("\"health_ranking\""));
        assert!(json.contains("\"charts\""));
    }

    #[test]
    fn test_write_report() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.md");
        write_report("# hi\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hi\n");
    }
}
