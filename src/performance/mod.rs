//! # Performance: Budget vs. Actual per Project
//!
//! Folds a project's budget fields and its logged time into a
//! [`PerformanceSummary`]: budgeted hours and cost, actual cost, variance,
//! cost performance index (CPI), and a coarse status label.
//!
//! ## Architecture
//!
//! ```text
//! GET /projects?include=tasks          (failure here fails the batch)
//!     ↓ one task per project, at most `max_concurrency` in flight
//! time::fetch_worked_seconds           (failure degrades to 0 seconds)
//!     ↓
//! compute_summary(project, seconds)    (pure arithmetic)
//!     ↓
//! Vec<PerformanceSummary>              (upstream project order)
//! ```
//!
//! ## Module Structure
//!
//! - [`summary`]: summary types and the pure computation
//! - [`batch`]: batch and single-project entry points over a [`crate::paymo::PaymoClient`]

mod batch;
mod summary;

pub use batch::*;
pub use summary::*;
