//! # paymo-dashboard
//!
//! Server-side proxy and dashboard in front of the Paymo project-management
//! API. Re-exposes read endpoints (projects, entries, invoices, reports) and
//! derives per-project budget performance from logged time.
//!
//! ## Module Structure
//!
//! - [`config`]: TOML file + CLI/env layering into a resolved [`config::DashboardConfig`]
//! - [`paymo`]: upstream HTTP client, wire types, typed upstream errors
//! - [`time`]: date windows, report queries, worked-time lookups with rate-limit retry
//! - [`performance`]: budget-vs-actual summaries, batch and single-project entry points
//! - [`projects`]: list and detail views derived from upstream project records
//! - [`prom_metrics`]: Prometheus registry for HTTP and upstream counters
//! - [`dashboard`]: Axum router, session auth, route handlers, server loop

pub mod config;
pub mod dashboard;
pub mod paymo;
pub mod performance;
pub mod projects;
pub mod prom_metrics;
pub mod time;
