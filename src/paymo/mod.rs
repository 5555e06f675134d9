//! # Paymo: Upstream API Client
//!
//! Thin async client for the Paymo REST API. Every request authenticates with
//! HTTP Basic auth (`<api_key>:X`) and asks for JSON. Clients are cheap to
//! clone and are built per request from the caller's credential over a shared
//! `reqwest` connection pool.
//!
//! ```text
//! dashboard route ──> AppState::paymo_client(api_key)
//!                       ├─ GET  /projects, /projects/{id}
//!                       ├─ GET  /entries (paginated)
//!                       ├─ GET  /invoices, /reports
//!                       └─ POST /reports  (temporary aggregation report)
//! ```
//!
//! ## Module Structure
//!
//! - [`client`]: request building, status mapping, pagination
//! - [`types`]: lenient wire types for projects, tasks, and time entries
//! - [`error`]: [`UpstreamError`] taxonomy

mod client;
mod error;
mod types;

pub use client::*;
pub use error::*;
pub use types::*;
