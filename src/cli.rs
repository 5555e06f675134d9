//! # CLI Execution Functions
//!
//! Execution logic for subcommands other than `serve`.

use anyhow::{Context, Result};
use paymo_dashboard::config::DashboardConfig;
use paymo_dashboard::paymo::{build_http_client, PaymoClient};
use paymo_dashboard::performance::{project_performance, PerformanceSummary};
use paymo_dashboard::time::{format_duration, DateWindow};
use tracing::info;

/// Compute performance for every project once and print it to stdout.
pub async fn run_report(
    config: &DashboardConfig,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let api_key = config
        .paymo
        .api_key
        .as_deref()
        .context("PAYMO_API_KEY is required (set via --api-key or env)")?;
    let window = DateWindow::parse(from, to)?;
    let http = build_http_client(config.paymo.request_timeout)?;
    let client = PaymoClient::new(http, config.paymo.base_url.as_str(), api_key);

    let summaries = project_performance(&client, &window, &config.performance).await?;
    info!(projects = summaries.len(), "performance report computed");

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    print_table(&summaries);
    Ok(())
}

fn print_table(summaries: &[PerformanceSummary]) {
    if summaries.is_empty() {
        eprintln!("No projects found");
        return;
    }
    println!(
        "{:<32} {:>10} {:>10} {:>12} {:>12} {:>12} {:>6}  {}",
        "PROJECT", "LOGGED", "BUDGET", "BUDGETED", "ACTUAL", "VARIANCE", "CPI", "STATUS"
    );
    println!("{}", "-".repeat(112));
    for s in summaries {
        let logged = format_duration((s.total_logged_hours * 3600.0).max(0.0) as u64);
        let budget = s
            .budgeted_hours
            .map(|h| format_duration((h * 3600.0).max(0.0) as u64))
            .unwrap_or_else(|| "-".to_string());
        let cpi = s
            .cost_performance_index
            .map(|c| format!("{c:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<32} {:>10} {:>10} {:>12.2} {:>12.2} {:>12.2} {:>6}  {}",
            truncate(&s.name, 32),
            logged,
            budget,
            s.budgeted_cost,
            s.actual_cost,
            s.cost_variance,
            cpi,
            s.status
        );
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut out: String = name.chars().take(width - 1).collect();
    out.push('~');
    out
}
