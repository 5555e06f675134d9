//! Batch and single-project entry points.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::{compute_summary, PerformanceSummary};
use crate::paymo::{PaymoClient, Project, UpstreamError};
use crate::prom_metrics::Metrics;
use crate::time::{self, DateWindow, RetryPolicy};

/// Tuning for batch computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceOptions {
    /// Upper bound on concurrent time lookups against Paymo.
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for PerformanceOptions {
    fn default() -> Self {
        PerformanceOptions {
            max_concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// Summaries for every project in the account.
///
/// Only a failure to list projects is returned as an error; failed time
/// lookups degrade that project's logged time to zero (or its recorded time).
pub async fn project_performance(
    client: &PaymoClient,
    window: &DateWindow,
    opts: &PerformanceOptions,
) -> Result<Vec<PerformanceSummary>, UpstreamError> {
    let projects = client.list_projects(Some("tasks"), None).await?;
    info!(projects = projects.len(), "computing project performance");
    Ok(summarize_projects(client, projects, window, opts).await)
}

/// Summary for one project, fetched with its tasks.
pub async fn single_project_performance(
    client: &PaymoClient,
    project_id: i64,
    window: &DateWindow,
    opts: &PerformanceOptions,
) -> Result<PerformanceSummary, UpstreamError> {
    let project = client.get_project(project_id, Some("tasks")).await?;
    let seconds = time::fetch_worked_seconds(client, project.id, window, &opts.retry).await;
    Ok(compute_summary(&project, seconds))
}

/// Drain lookup tasks into a per-index vector. A task that did not complete
/// leaves its slot at zero and counts as a time-lookup fallback.
pub(crate) async fn collect_worked_seconds(
    mut lookups: JoinSet<(usize, f64)>,
    len: usize,
    metrics: Option<&Metrics>,
) -> Vec<f64> {
    let mut worked = vec![0.0; len];
    while let Some(joined) = lookups.join_next().await {
        match joined {
            Ok((idx, seconds)) => worked[idx] = seconds,
            Err(e) => {
                warn!(error = %e, "time lookup task did not complete, reporting 0 seconds");
                if let Some(metrics) = metrics {
                    metrics.time_lookup_fallbacks.inc();
                }
            }
        }
    }
    worked
}

/// Look up worked time for each project on a bounded pool and compute the
/// summaries in input order.
pub async fn summarize_projects(
    client: &PaymoClient,
    projects: Vec<Project>,
    window: &DateWindow,
    opts: &PerformanceOptions,
) -> Vec<PerformanceSummary> {
    let limit = Arc::new(Semaphore::new(opts.max_concurrency.max(1)));
    let mut lookups = JoinSet::new();

    for (idx, project) in projects.iter().enumerate() {
        let client = client.clone();
        let limit = Arc::clone(&limit);
        let window = *window;
        let retry = opts.retry.clone();
        let project_id = project.id;
        lookups.spawn(async move {
            let _permit = limit.acquire_owned().await.ok();
            let seconds = time::fetch_worked_seconds(&client, project_id, &window, &retry).await;
            (idx, seconds)
        });
    }

    let worked = collect_worked_seconds(lookups, projects.len(), client.metrics()).await;

    projects
        .iter()
        .zip(worked)
        .map(|(project, seconds)| compute_summary(project, seconds))
        .collect()
}
