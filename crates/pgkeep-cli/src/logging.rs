//! Logging and tracing setup for the pgkeep binary
//!
//! Console output goes to stderr so stdout stays reserved for reports. A JSON
//! file layer is added depending on the configured log channel:
//! - `daily`: one file per day
//! - `single`: one file that is never rotated
//! - `stderr`: no file

use anyhow::bail;
use pgkeep_standards::LogSettings;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_NAME: &str = "pgkeep.log";

/// Where structured log records are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogChannel {
    Daily,
    Single,
    Stderr,
}

impl FromStr for LogChannel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(LogChannel::Daily),
            "single" => Ok(LogChannel::Single),
            "stderr" => Ok(LogChannel::Stderr),
            other => bail!("unknown log channel '{}' (expected daily, single or stderr)", other),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files should be written
    pub log_dir: PathBuf,

    pub channel: LogChannel,

    /// Whether to write human-readable records to stderr
    pub enable_console_logs: bool,

    /// Whether to include file/line information in logs
    pub include_location: bool,

    /// Default filter when `RUST_LOG` is not set
    pub default_filter: String,
}

impl LoggingConfig {
    /// Warnings and helper activity on the console, structured file records
    pub fn production() -> Self {
        Self {
            log_dir: crate::settings_file::log_dir(),
            channel: LogChannel::Daily,
            enable_console_logs: true,
            include_location: false,
            default_filter: "warn,pgkeep_standards=info,pgkeep_postgres=info".to_string(),
        }
    }

    /// Verbose console output
    pub fn development() -> Self {
        Self {
            include_location: true,
            default_filter: "info,pgkeep_core=debug,pgkeep_postgres=debug,pgkeep_standards=debug"
                .to_string(),
            ..Self::production()
        }
    }

    /// Configuration for a CLI run
    pub fn from_settings(settings: &LogSettings, verbose: bool) -> anyhow::Result<Self> {
        let base = if verbose {
            Self::development()
        } else {
            Self::production()
        };
        Ok(Self {
            channel: settings.channel.parse()?,
            ..base
        })
    }
}

/// Initialize the global subscriber
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let mut layers = Vec::new();

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .with_filter(env_filter.clone())
            .boxed();

        layers.push(console_layer);
    }

    let appender = match config.channel {
        LogChannel::Daily => Some(tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_NAME)),
        LogChannel::Single => Some(tracing_appender::rolling::never(&config.log_dir, LOG_FILE_NAME)),
        LogChannel::Stderr => None,
    };

    if let Some(appender) = appender {
        std::fs::create_dir_all(&config.log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        // The guard flushes on drop and must outlive the process' logging.
        std::mem::forget(guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        channel = ?config.channel,
        "Logging system initialized"
    );

    Ok(())
}
