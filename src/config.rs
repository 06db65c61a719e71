//! Application configuration using Figment
//!
//! Configuration is loaded from:
//! 1. `config/osa.toml` (or the file given with `--config`)
//! 2. Environment variables prefixed with `RUST_OSA_`, nested with `__`
//!
//! ```bash
//! RUST_OSA_INSTRUMENT__PORT=/dev/ttyUSB1 RUST_OSA_APPLICATION__LOG_LEVEL=debug rust-osa get span
//! ```

use crate::export::ExportFormat;
use crate::logging::OutputFormat;
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use osa_driver::OsaConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/osa.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name and logging
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Serial link to the analyzer
    pub instrument: OsaConfig,
    /// Trace export defaults
    #[serde(default)]
    pub export: ExportConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name shown in logs
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default)]
    pub log_format: OutputFormat,
}

/// Trace export defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Format used when neither `--format` nor the file extension decides
    #[serde(default)]
    pub format: ExportFormat,
    /// Directory for relative `--output` paths
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_name() -> String {
    "rust-osa".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: OutputFormat::default(),
        }
    }
}

impl AppConfig {
    /// Provider stack without extraction, so callers can merge overrides.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("RUST_OSA_").split("__"))
    }

    /// Extract and validate.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .context("Failed to load spectrum analyzer configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            bail!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            );
        }

        self.instrument
            .validate()
            .context("Invalid [instrument] section")?;

        Ok(())
    }

    /// Resolve an output path against `export.output_dir`.
    pub fn output_path(&self, path: &Path) -> PathBuf {
        match &self.export.output_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
