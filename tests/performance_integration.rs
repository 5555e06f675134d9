//! Performance computation against a mock Paymo API: batch fan-out,
//! per-project failure isolation, and rate-limit retries.

mod common;

use common::{client_for, fast_options, MockPaymo};
use paymo_dashboard::paymo::UpstreamError;
use paymo_dashboard::performance::{
    project_performance, single_project_performance, BudgetState, BudgetStatus,
};
use paymo_dashboard::time::{try_fetch_worked_seconds, DateWindow, RetryPolicy};
use serde_json::json;
use std::time::Duration;

fn hourly(id: i64, budget: f64, rate: f64) -> serde_json::Value {
    json!({"id": id, "name": format!("P{id}"), "active": true,
           "budget_hours": budget, "price_per_hour": rate})
}

#[tokio::test]
async fn failed_lookup_degrades_only_that_project() {
    let mock = MockPaymo::builder()
        .with_project(hourly(1, 10.0, 100.0), 5.0 * 3600.0)
        .with_project(hourly(2, 10.0, 100.0), 8.0 * 3600.0)
        .with_project(hourly(3, 10.0, 100.0), 12.0 * 3600.0)
        .with_failing_report(2)
        .start()
        .await;
    let client = client_for(&mock);

    let summaries = project_performance(&client, &DateWindow::all_time(), &fast_options(0))
        .await
        .unwrap();

    assert_eq!(summaries.len(), 3);
    let ids: Vec<i64> = summaries.iter().map(|s| s.project_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(summaries[0].total_logged_hours, 5.0);
    assert_eq!(summaries[1].total_logged_hours, 0.0);
    assert_eq!(summaries[1].status, BudgetStatus::WithinBudget);
    assert_eq!(summaries[2].total_logged_hours, 12.0);
    assert_eq!(summaries[2].status, BudgetStatus::OverBudget);
}

#[tokio::test]
async fn failed_lookup_falls_back_to_recorded_time() {
    let mock = MockPaymo::builder()
        .with_project(
            json!({"id": 4, "name": "Recorded", "budget_hours": 10, "price_per_hour": 10,
                   "recorded_time": 7200}),
            0.0,
        )
        .with_failing_report(4)
        .start()
        .await;
    let client = client_for(&mock);

    let summary = single_project_performance(&client, 4, &DateWindow::all_time(), &fast_options(0))
        .await
        .unwrap();
    assert_eq!(summary.total_logged_hours, 2.0);
    assert_eq!(summary.actual_cost, 20.0);
}

#[tokio::test]
async fn rate_limited_lookup_retries_then_succeeds() {
    let mock = MockPaymo::builder()
        .with_project(hourly(1, 10.0, 50.0), 3600.0)
        .with_rate_limited_reports(2)
        .start()
        .await;
    let client = client_for(&mock);
    let policy = RetryPolicy {
        backoff: Duration::from_millis(10),
        max_retries: 3,
    };

    let seconds = try_fetch_worked_seconds(&client, 1, &DateWindow::all_time(), &policy)
        .await
        .unwrap();
    assert_eq!(seconds, 3600.0);
    assert_eq!(mock.report_requests().len(), 3);
}

#[tokio::test]
async fn rate_limit_retries_are_bounded() {
    let mock = MockPaymo::builder()
        .with_project(hourly(1, 10.0, 50.0), 3600.0)
        .with_rate_limited_reports(10)
        .start()
        .await;
    let client = client_for(&mock);
    let policy = RetryPolicy {
        backoff: Duration::from_millis(5),
        max_retries: 2,
    };

    let err = try_fetch_worked_seconds(&client, 1, &DateWindow::all_time(), &policy)
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::RateLimited));
    assert_eq!(mock.report_requests().len(), 3);
}

#[tokio::test]
async fn listing_failure_propagates() {
    let mock = MockPaymo::builder().with_projects_error(503).start().await;
    let client = client_for(&mock);

    let err = project_performance(&client, &DateWindow::all_time(), &fast_options(0))
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 503, .. }));
}

#[tokio::test]
async fn empty_account_yields_empty_list() {
    let mock = MockPaymo::start().await;
    let client = client_for(&mock);

    let summaries = project_performance(&client, &DateWindow::all_time(), &fast_options(0))
        .await
        .unwrap();
    assert!(summaries.is_empty());
    assert!(mock.report_requests().is_empty());
}

#[tokio::test]
async fn batch_requests_projects_with_tasks() {
    let mock = MockPaymo::builder()
        .with_project(
            json!({"id": 9, "name": "Tasks", "price_per_hour": 10,
                   "tasks": [{"id": 1, "budget_hours": 3}, {"id": 2, "budget_hours": 2}]}),
            3600.0,
        )
        .start()
        .await;
    let client = client_for(&mock);

    let summaries = project_performance(&client, &DateWindow::all_time(), &fast_options(0))
        .await
        .unwrap();
    assert_eq!(summaries[0].budgeted_hours, Some(5.0));
    assert_eq!(summaries[0].budget_state, BudgetState::Set);
    assert_eq!(summaries[0].budgeted_cost, 50.0);
    assert_eq!(
        mock.project_queries()[0].get("include").map(String::as_str),
        Some("tasks")
    );
}

#[tokio::test]
async fn many_projects_complete_under_concurrency_bound() {
    let mut builder = MockPaymo::builder();
    for id in 1..=20 {
        builder = builder.with_project(hourly(id, 1.0, 1.0), id as f64 * 3600.0);
    }
    let mock = builder.start().await;
    let client = client_for(&mock);
    let mut opts = fast_options(0);
    opts.max_concurrency = 3;

    let summaries = project_performance(&client, &DateWindow::all_time(), &opts)
        .await
        .unwrap();
    assert_eq!(summaries.len(), 20);
    for (i, s) in summaries.iter().enumerate() {
        assert_eq!(s.project_id, i as i64 + 1);
        assert_eq!(s.total_logged_hours, (i + 1) as f64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn report_requests_never_exceed_max_concurrency() {
    let mut builder = MockPaymo::builder().with_report_delay(Duration::from_millis(50));
    for id in 1..=12 {
        builder = builder.with_project(hourly(id, 1.0, 1.0), 3600.0);
    }
    let mock = builder.start().await;
    let client = client_for(&mock);
    let mut opts = fast_options(0);
    opts.max_concurrency = 3;

    let summaries = project_performance(&client, &DateWindow::all_time(), &opts)
        .await
        .unwrap();
    assert_eq!(summaries.len(), 12);
    assert!(summaries.iter().all(|s| s.total_logged_hours == 1.0));
    assert_eq!(mock.report_requests().len(), 12);

    let peak = mock.peak_concurrent_reports();
    assert!(peak <= 3, "peak of {peak} concurrent report requests");
    assert!(peak >= 2, "lookups ran one at a time");
}
