//! Structured logging initialization
//!
//! Sets up a `tracing` subscriber with an [`EnvFilter`] and a JSON or
//! pretty-printed formatter. `RUST_LOG`, when set, overrides the configured
//! level with full filter directives.
//!
//! Logging is optional: the pipeline emits `tracing` events whether or not a
//! subscriber is installed, so library users and tests can skip this module.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::ServiceConfig;

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Stream log lines are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogWriter {
    #[default]
    Stdout,
    /// Keeps stdout free for command output
    Stderr,
}

/// Targets capped at `warn`: tiny_http and the HTTP client stack are noisy below it.
pub const QUIET_TARGETS: &[&str] = &[
    "tiny_http=warn",
    "hyper_util=warn",
    "reqwest=warn",
    "rustls_platform_verifier=warn",
];

/// Parse a level name; unknown names fall back to `DEBUG`.
pub fn parse_level(s: &str) -> Level {
    match s.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" | "critical" => Level::ERROR,
        _ => Level::DEBUG,
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub level: Level,
    /// Log format: json/pretty
    pub format: LogFormat,
    /// Output stream
    pub writer: LogWriter,
    /// Write through a background thread instead of blocking on the stream
    pub async_logging: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            writer: LogWriter::Stdout,
            async_logging: false,
        }
    }
}

impl LogConfig {
    /// Derive logging settings from the service configuration.
    pub fn from_service_config(config: &ServiceConfig) -> Self {
        Self {
            level: parse_level(&config.log_level),
            format: LogFormat::parse(&config.log_format),
            ..Self::default()
        }
    }

    /// Toggle background writing
    pub fn async_logging(mut self, enabled: bool) -> Self {
        self.async_logging = enabled;
        self
    }

    /// Choose the output stream
    pub fn writer(mut self, writer: LogWriter) -> Self {
        self.writer = writer;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));
        for directive in QUIET_TARGETS {
            if let Ok(directive) = directive.parse() {
                env_filter = env_filter.add_directive(directive);
            }
        }
        env_filter
    }

    fn make_writer(&self) -> (BoxMakeWriter, Option<WorkerGuard>) {
        match (self.async_logging, self.writer) {
            (true, LogWriter::Stdout) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
                (BoxMakeWriter::new(non_blocking), Some(guard))
            }
            (true, LogWriter::Stderr) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
                (BoxMakeWriter::new(non_blocking), Some(guard))
            }
            (false, LogWriter::Stdout) => (BoxMakeWriter::new(std::io::stdout), None),
            (false, LogWriter::Stderr) => (BoxMakeWriter::new(std::io::stderr), None),
        }
    }
}

/// Install the global subscriber.
///
/// Returns the background writer's guard when `async_logging` is enabled; keep
/// it alive for the life of the process so buffered events are flushed.
///
/// ```no_run
/// use review_gate::config::ServiceConfig;
/// use review_gate::logging::{init_logging, LogConfig};
///
/// let config = ServiceConfig::from_env();
/// let _guard = init_logging(&LogConfig::from_service_config(&config))
///     .expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = config.make_writer();

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("info"), Level::INFO);
        assert_eq!(parse_level("WARNING"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("nonsense"), Level::DEBUG);
    }

    #[test]
    fn test_from_service_config() {
        let service = ServiceConfig {
            log_level: "info".into(),
            log_format: "pretty".into(),
            ..ServiceConfig::default()
        };
        let config = LogConfig::from_service_config(&service);
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.async_logging);
        assert_eq!(config.writer, LogWriter::Stdout);
        assert_eq!(config.writer(LogWriter::Stderr).writer, LogWriter::Stderr);
    }

    #[test]
    fn test_quiet_targets_are_valid_directives() {
        assert!(QUIET_TARGETS.contains(&"rustls_platform_verifier=warn"));
        for directive in QUIET_TARGETS {
            assert!(
                directive.parse::<tracing_subscriber::filter::Directive>().is_ok(),
                "{directive}"
            );
        }
    }

    #[test]
    fn test_format_defaults_to_json() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Json);
        assert_eq!(LogFormat::parse("Pretty"), LogFormat::Pretty);
    }
}
