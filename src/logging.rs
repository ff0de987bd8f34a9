//! Structured logging for stashcode.
//!
//! Diagnostics go to stderr at the chosen verbosity so they never mix with
//! command output on stdout. A log file, when configured, always receives
//! debug-level records.

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    #[default]
    Quiet,
    /// Normal logging (info level)
    Normal,
    /// Verbose logging (debug level)
    Verbose,
    /// Very verbose logging (trace level)
    Trace,
}

impl Verbosity {
    /// Map a `-v` repeat count to a verbosity.
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Verbosity::Quiet,
            1 => Verbosity::Normal,
            2 => Verbosity::Verbose,
            _ => Verbosity::Trace,
        }
    }

    /// Get the tracing level filter for this verbosity.
    pub fn as_level_filter(&self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::ERROR,
            Verbosity::Normal => LevelFilter::INFO,
            Verbosity::Verbose => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Verbosity level for stderr output.
    pub verbosity: Verbosity,
    /// Optional path to log file.
    pub log_file: Option<String>,
}

/// Guard that must be kept alive for the duration of logging.
///
/// When this guard is dropped, the logging system will flush pending logs.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging system.
///
/// Returns a guard that must be kept alive for the duration of logging.
///
/// ```ignore
/// use stashcode::logging::{init_logging, LogConfig, Verbosity};
///
/// let _guard = init_logging(&LogConfig {
///     verbosity: Verbosity::Verbose,
///     log_file: Some("/tmp/stashcode.log".to_string()),
/// });
/// tracing::info!("Logging initialized");
/// ```
pub fn init_logging(config: &LogConfig) -> LogGuard {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let (subscriber, file_guard) = build_subscriber(config, &directives);
    subscriber.init();

    LogGuard {
        _file_guard: file_guard,
    }
}

/// Stderr filter: `RUST_LOG`-style directives over the verbosity default.
fn stderr_filter(verbosity: Verbosity, directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(verbosity.as_level_filter().into())
        .parse_lossy(directives)
}

/// Stderr layer filtered by verbosity and directives, plus the optional
/// file layer at debug regardless of either.
fn build_subscriber(
    config: &LogConfig,
    directives: &str,
) -> (impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>) {
    let (file_layer, file_guard) = if let Some(ref log_file_path) = config.log_file {
        let path = Path::new(log_file_path);
        let parent_dir = path.parent().unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("stashcode.log");

        let file_appender = tracing_appender::rolling::never(parent_dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(non_blocking)
            .with_filter(LevelFilter::DEBUG);

        (Some(file_layer), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = fmt::layer()
        .with_ansi(true)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter(config.verbosity, directives));

    let subscriber = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer);

    (subscriber, file_guard)
}
