//! Runtime configuration.
//!
//! Settings come from three layers, highest precedence first:
//!
//! 1. CLI flags and environment variables (parsed by clap in `main.rs`)
//! 2. An optional TOML file (`--config dashboard.toml`)
//! 3. Built-in defaults
//!
//! The TOML file mirrors the resolved structure:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1"
//! port = 7002
//! static_dir = "web/out"
//!
//! [paymo]
//! base_url = "https://app.paymoapp.com/api"
//! api_key = "..."
//! request_timeout_secs = 30
//!
//! [auth]
//! dashboard_password = "..."
//! session_secret = "..."
//! session_ttl_hours = 12
//!
//! [performance]
//! max_concurrency = 4
//! rate_limit_backoff_ms = 2000
//! max_rate_limit_retries = 3
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::performance::PerformanceOptions;
use crate::time::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://app.paymoapp.com/api";
pub const DEFAULT_PORT: u16 = 7002;
pub const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_TTL_HOURS: u64 = 12;
/// One year.
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;

// ── TOML File Structs ───────────────────────────────────────────

/// Contents of the optional TOML configuration file. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub paymo: PaymoSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub performance: PerformanceSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymoSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    pub dashboard_password: Option<String>,
    pub session_secret: Option<String>,
    pub session_ttl_hours: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceSection {
    pub max_concurrency: Option<usize>,
    pub rate_limit_backoff_ms: Option<u64>,
    pub max_rate_limit_retries: Option<u32>,
}

/// Parse a TOML configuration string.
pub fn parse_toml(content: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(content)?;
    Ok(config)
}

/// Read and parse a TOML configuration file.
pub fn load_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_toml(&content).with_context(|| format!("invalid config file {}", path.display()))
}

// ── CLI/env Overrides ───────────────────────────────────────────

/// Values supplied on the command line or through the environment.
/// `None` means "not given", so the file or default value applies.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub dashboard_password: Option<String>,
    pub session_secret: Option<String>,
    pub max_concurrency: Option<usize>,
    pub rate_limit_backoff_ms: Option<u64>,
    pub max_rate_limit_retries: Option<u32>,
}

// ── Resolved Configuration ──────────────────────────────────────

/// Upstream connection settings.
#[derive(Debug, Clone)]
pub struct PaymoSettings {
    pub base_url: url::Url,
    /// Default credential used when a session does not carry its own key.
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

/// Dashboard login settings. With no password the dashboard is open.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub dashboard_password: Option<String>,
    pub session_secret: String,
    pub session_ttl: Duration,
}

/// Fully resolved configuration used to build the dashboard state.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub bind: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub paymo: PaymoSettings,
    pub auth: AuthSettings,
    pub performance: PerformanceOptions,
}

impl DashboardConfig {
    /// Merge file values under the overrides and validate the result.
    pub fn resolve(file: FileConfig, overrides: ConfigOverrides) -> Result<Self> {
        let base_url_raw = overrides
            .base_url
            .or(file.paymo.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url(&base_url_raw)?;

        let session_secret = match non_empty(overrides.session_secret.or(file.auth.session_secret))
        {
            Some(secret) => secret,
            None => {
                warn!("no session secret configured, sessions will not survive a restart");
                uuid::Uuid::new_v4().to_string()
            }
        };

        let defaults = PerformanceOptions::default();
        let max_concurrency = overrides
            .max_concurrency
            .or(file.performance.max_concurrency)
            .unwrap_or(defaults.max_concurrency);
        if max_concurrency == 0 {
            anyhow::bail!("max_concurrency must be at least 1");
        }
        let backoff = overrides
            .rate_limit_backoff_ms
            .or(file.performance.rate_limit_backoff_ms)
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.backoff);
        let max_retries = overrides
            .max_rate_limit_retries
            .or(file.performance.max_rate_limit_retries)
            .unwrap_or(defaults.retry.max_retries);

        let ttl_hours = file
            .auth
            .session_ttl_hours
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS);
        if ttl_hours > MAX_SESSION_TTL_HOURS {
            anyhow::bail!(
                "session_ttl_hours must be at most {MAX_SESSION_TTL_HOURS}, got {ttl_hours}"
            );
        }
        let session_ttl = ttl_hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .context("session_ttl_hours is too large")?;

        Ok(DashboardConfig {
            bind: overrides
                .bind
                .or(file.server.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: overrides.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
            static_dir: overrides.static_dir.or(file.server.static_dir),
            paymo: PaymoSettings {
                base_url,
                api_key: non_empty(overrides.api_key.or(file.paymo.api_key)),
                request_timeout: Duration::from_secs(
                    overrides
                        .request_timeout_secs
                        .or(file.paymo.request_timeout_secs)
                        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
                ),
            },
            auth: AuthSettings {
                dashboard_password: non_empty(
                    overrides
                        .dashboard_password
                        .or(file.auth.dashboard_password),
                ),
                session_secret,
                session_ttl,
            },
            performance: PerformanceOptions {
                max_concurrency,
                retry: RetryPolicy {
                    backoff,
                    max_retries,
                },
            },
        })
    }

    /// Configuration pointing at `base_url` with defaults everywhere else.
    /// Used by tests and embedders that build the router directly.
    pub fn for_upstream(base_url: &str, api_key: Option<&str>) -> Result<Self> {
        Self::resolve(
            FileConfig::default(),
            ConfigOverrides {
                base_url: Some(base_url.to_string()),
                api_key: api_key.map(str::to_string),
                session_secret: Some("test-session-secret".to_string()),
                ..ConfigOverrides::default()
            },
        )
    }
}

fn parse_base_url(raw: &str) -> Result<url::Url> {
    let url = url::Url::parse(raw).with_context(|| format!("invalid Paymo base URL: {raw}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => anyhow::bail!("unsupported Paymo base URL scheme: {other}"),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
