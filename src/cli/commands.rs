use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::ServiceConfig;
use crate::logging::{init_logging, LogConfig, LogWriter};
use crate::server::{HttpServer, ReviewRequest, ReviewService, ServerHandle};

/// Command-line interface for the review submission endpoint
#[derive(Parser, Debug)]
#[command(name = "review-gate")]
#[command(about = "Review submission endpoint", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every command. Each flag falls back to its environment
/// variable, then to the built-in default.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Store table identifier
    #[arg(long, global = true, env = "REVIEW_TABLE_NAME")]
    pub table: Option<String>,

    /// Token validation endpoint URL
    #[arg(long, global = true, env = "TOKEN_VALIDATION_ENDPOINT")]
    pub token_endpoint: Option<String>,

    /// Directory of the file-backed store (in-memory when unset)
    #[arg(long, global = true, env = "REVIEW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log verbosity: trace, debug, info, warn, error
    #[arg(long, global = true, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format: json or pretty
    #[arg(long, global = true, env = "LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Regex the `Origin` header must match
    #[arg(long, global = true, env = "REVIEW_ALLOWED_ORIGIN_PATTERN")]
    pub allowed_origin_pattern: Option<String>,

    /// `Access-Control-Allow-Origin` value for untrusted origins
    #[arg(long, global = true, env = "REVIEW_FALLBACK_ORIGIN")]
    pub fallback_origin: Option<String>,

    /// Token validation timeout in milliseconds
    #[arg(long, global = true, env = "REVIEW_TOKEN_TIMEOUT_MS")]
    pub token_timeout_ms: Option<u64>,
}

impl ConfigArgs {
    /// Overlay the flags onto a base configuration. Empty values are ignored.
    pub fn apply(&self, mut config: ServiceConfig) -> ServiceConfig {
        fn set(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value.as_ref().filter(|v| !v.trim().is_empty()) {
                *target = Some(v.clone());
            }
        }
        set(&mut config.table_name, &self.table);
        set(&mut config.token_validation_endpoint, &self.token_endpoint);
        if let Some(dir) = self.data_dir.as_ref().filter(|d| !d.as_os_str().is_empty()) {
            config.data_dir = Some(dir.clone());
        }
        if let Some(level) = self.log_level.as_ref().filter(|v| !v.trim().is_empty()) {
            config.log_level = level.to_lowercase();
        }
        if let Some(format) = self.log_format.as_ref().filter(|v| !v.trim().is_empty()) {
            config.log_format = format.to_lowercase();
        }
        if let Some(pattern) = self
            .allowed_origin_pattern
            .as_ref()
            .filter(|v| !v.trim().is_empty())
        {
            config.allowed_origin_pattern = pattern.clone();
        }
        if let Some(origin) = self.fallback_origin.as_ref().filter(|v| !v.trim().is_empty()) {
            config.fallback_origin = origin.clone();
        }
        if let Some(ms) = self.token_timeout_ms {
            config.token_timeout = Duration::from_millis(ms);
        }
        config
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the endpoint over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "REVIEW_BIND_ADDR")]
        bind: Option<String>,

        /// Number of worker threads (default: available parallelism)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Write logs through a background thread
        #[arg(long, default_value_t = false)]
        async_logging: bool,
    },
    /// Run one gateway proxy event through the pipeline and print the result
    Invoke {
        /// Path to the event JSON file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: String,
    },
}

/// Parse arguments and run the selected command
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

/// Run an already-parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let config = cli.config.apply(ServiceConfig::from_env());
    match cli.command {
        Commands::Serve {
            bind,
            workers,
            async_logging,
        } => {
            let _guard = init_logging(
                &LogConfig::from_service_config(&config).async_logging(async_logging),
            )?;
            let bind = bind
                .filter(|b| !b.trim().is_empty())
                .unwrap_or_else(|| config.bind_addr.clone());
            let service = ReviewService::from_config(config)?;
            let mut server = HttpServer::new(service);
            if let Some(workers) = workers {
                server = server.workers(workers);
            }
            let handle = server
                .start(bind.as_str())
                .with_context(|| format!("Failed to bind {bind}"))?;
            wait_for_shutdown(handle)
        }
        Commands::Invoke { event } => {
            // stdout carries only the result document.
            let _guard = init_logging(
                &LogConfig::from_service_config(&config).writer(LogWriter::Stderr),
            )?;
            let raw = read_event(&event)?;
            let request = ReviewRequest::from_event_json(&raw)
                .with_context(|| format!("Invalid event JSON in {event}"))?;
            let service = ReviewService::from_config(config)?;
            let envelope = service.handle(&request);
            println!("{}", serde_json::to_string_pretty(&envelope.to_event_json())?);
            Ok(())
        }
    }
}

fn read_event(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read event from stdin")?;
        Ok(raw)
    } else {
        fs::read_to_string(source).with_context(|| format!("Failed to read event file {source}"))
    }
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("HTTP worker panicked"))
}
