//! Tracing setup for the command-line tool.
//!
//! Events go to stderr so trace data written to stdout stays clean. The
//! `RUST_LOG` environment variable, when set, replaces the configured level.
//!
//! # Example
//! ```no_run
//! use rust_osa::logging::{self, OutputFormat, TracingConfig};
//! use tracing::Level;
//!
//! # fn main() -> anyhow::Result<()> {
//! logging::init(TracingConfig::new(Level::DEBUG).with_format(OutputFormat::Json))?;
//! tracing::info!("Application started");
//! # Ok(())
//! # }
//! ```

use crate::config::AppConfig;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Output format for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed format with colors (for development)
    Pretty,
    /// Single-line format without colors
    #[default]
    Compact,
    /// JSON format for structured logging
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "compact" => Ok(OutputFormat::Compact),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!(
                "Invalid log format '{s}'. Must be one of: pretty, compact, json"
            )),
        }
    }
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Most verbose level emitted
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Emit span NEW/CLOSE events (driver operations are instrumented)
    pub with_span_events: bool,
    /// Source file and line on each event
    pub with_file_and_line: bool,
    /// ANSI colors (Pretty format only)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
            with_span_events: false,
            with_file_and_line: false,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Pretty output at `level`.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Level and format from the `[application]` section.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let level = parse_log_level(&config.application.log_level)?;
        Ok(Self::new(level).with_format(config.application.log_format))
    }

    /// Output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Log span open/close events.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// Color codes on or off.
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize tracing from the application configuration.
pub fn init_from_config(config: &AppConfig) -> Result<()> {
    init(TracingConfig::from_app_config(config)?)
}

/// Install the global subscriber.
///
/// Idempotent: a second call leaves the first subscriber in place.
pub fn init(config: TracingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_string(config.level)));

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_file(config.with_file_and_line)
        .with_line_number(config.with_file_and_line);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        OutputFormat::Pretty => base
            .pretty()
            .with_ansi(config.with_ansi)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Compact => base
            .compact()
            .with_ansi(false)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Json => base.json().with_filter(env_filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .or_else(|e| {
            // Expected in tests and when a library installed one first.
            if e.to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(anyhow!("Failed to initialize tracing: {e}"))
            }
        })
}

/// Parse log level string into tracing Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow!(
            "Invalid log level '{level}'. Must be one of: trace, debug, info, warn, error"
        )),
    }
}

fn level_to_filter_string(level: Level) -> String {
    level.as_str().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
        assert_eq!(parse_log_level("warn").unwrap(), Level::WARN);

        // Case insensitive
        assert_eq!(parse_log_level("INFO").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("Debug").unwrap(), Level::DEBUG);

        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("pretty".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_tracing_config_builder() {
        let config = TracingConfig::new(Level::WARN)
            .with_format(OutputFormat::Json)
            .with_span_events(true)
            .with_ansi(false);

        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.with_span_events);
        assert!(!config.with_ansi);
    }

    #[test]
    fn test_level_filter_string() {
        assert_eq!(level_to_filter_string(Level::DEBUG), "debug");
        assert_eq!(level_to_filter_string(Level::ERROR), "error");
    }

    #[test]
    fn test_init_is_idempotent() {
        assert!(init(TracingConfig::default()).is_ok());
        assert!(init(TracingConfig::new(Level::DEBUG)).is_ok());
    }
}
