//! # Main: CLI Entry Point
//!
//! Parses flags (with environment fallbacks), layers them over an optional
//! TOML config file, and dispatches to a subcommand:
//!
//! - `serve` (default): run the dashboard web server.
//! - `report`: compute project performance once and print it.
//!
//! ## Configuration precedence
//!
//! CLI flag / environment variable > `--config` TOML file > built-in default.
//! A `.env` file in the working directory is loaded first.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use paymo_dashboard::config::{self, ConfigOverrides, DashboardConfig, FileConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "paymo-dashboard",
    version,
    about = "Paymo API proxy and project budget performance dashboard"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "PAYMO_DASHBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Default Paymo API key, used when a session has none
    #[arg(long, env = "PAYMO_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Paymo API base URL
    #[arg(long, env = "PAYMO_BASE_URL")]
    base_url: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// Maximum concurrent time lookups against Paymo
    #[arg(long, env = "MAX_CONCURRENCY")]
    max_concurrency: Option<usize>,

    /// Wait before retrying a rate-limited time lookup, in milliseconds
    #[arg(long, env = "RATE_LIMIT_BACKOFF_MS")]
    rate_limit_backoff_ms: Option<u64>,

    /// Retries for a rate-limited time lookup before reporting zero
    #[arg(long, env = "MAX_RATE_LIMIT_RETRIES")]
    max_rate_limit_retries: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard web server
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT")]
        port: Option<u16>,
        /// Address to bind
        #[arg(long, env = "BIND")]
        bind: Option<String>,
        /// Directory with a static frontend export to serve
        #[arg(long, env = "STATIC_DIR")]
        static_dir: Option<PathBuf>,
        /// Password required to use the dashboard (open when unset)
        #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        dashboard_password: Option<String>,
        /// Secret used to sign session cookies
        #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
        session_secret: Option<String>,
    },
    /// Print budget performance for every project
    Report {
        /// Start of the window (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// End of the window (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            request_timeout_secs: self.request_timeout_secs,
            max_concurrency: self.max_concurrency,
            rate_limit_backoff_ms: self.rate_limit_backoff_ms,
            max_rate_limit_retries: self.max_rate_limit_retries,
            ..ConfigOverrides::default()
        };
        if let Some(Commands::Serve {
            port,
            bind,
            static_dir,
            dashboard_password,
            session_secret,
        }) = &self.command
        {
            overrides.port = *port;
            overrides.bind = bind.clone();
            overrides.static_dir = static_dir.clone();
            overrides.dashboard_password = dashboard_password.clone();
            overrides.session_secret = session_secret.clone();
        }
        overrides
    }

    fn resolve_config(&self) -> Result<DashboardConfig> {
        let file = match &self.config {
            Some(path) => config::load_file(path)?,
            None => FileConfig::default(),
        };
        DashboardConfig::resolve(file, self.overrides())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // LOG_FORMAT=json for log shippers, human-readable otherwise
    if std::env::var("LOG_FORMAT").unwrap_or_default() == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let rt = tokio::runtime::Runtime::new()?;

    match &cli.command {
        Some(Commands::Report { from, to, json }) => {
            rt.block_on(cli::run_report(&config, from.as_deref(), to.as_deref(), *json))
        }
        Some(Commands::Serve { .. }) | None => {
            rt.block_on(paymo_dashboard::dashboard::run(config))
        }
    }
}
