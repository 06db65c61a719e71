//! Driver configuration.
//!
//! `OsaConfig` deserialises from the `[instrument]` table of the application
//! config:
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! timeout_ms = 15000
//! ```

use osa_core::{OsaError, OsaResult, ScalePolicy, TraceDecoder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Baud rates the analyzer's RS-232 interface can be set to.
const SUPPORTED_BAUD_RATES: [u32; 6] = [1200, 2400, 4800, 9600, 19200, 38400];

/// Serial link and decoding settings for one analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsaConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0", "COM3")
    pub port: String,
    /// Baud rate (1200 to 38400, matching the front panel setting)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Reply timeout for queries and for the first byte of a binary dump.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Longest silence tolerated inside a binary dump.
    #[serde(default = "default_block_idle_timeout_ms")]
    pub block_idle_timeout_ms: u64,
    /// Attempts per query before a link error is reported.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Command terminator appended to every command.
    #[serde(default = "default_terminator")]
    pub terminator: String,
    /// Command that releases remote control, if the link has one.
    #[serde(default)]
    pub local_command: Option<String>,
    /// Reject level-scale replies that name neither LOG nor LIN.
    #[serde(default)]
    pub strict_scale_mode: bool,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_block_idle_timeout_ms() -> u64 {
    1_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_terminator() -> String {
    "\r\n".to_string()
}

impl OsaConfig {
    /// Defaults for everything but the port.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            block_idle_timeout_ms: default_block_idle_timeout_ms(),
            max_retries: default_max_retries(),
            terminator: default_terminator(),
            local_command: None,
            strict_scale_mode: false,
        }
    }

    /// Reject settings that cannot open a link.
    pub fn validate(&self) -> OsaResult<()> {
        if self.port.trim().is_empty() {
            return Err(OsaError::Configuration("port must not be empty".into()));
        }
        if !SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            return Err(OsaError::Configuration(format!(
                "baud_rate {} not supported (expected one of {:?})",
                self.baud_rate, SUPPORTED_BAUD_RATES
            )));
        }
        if self.timeout_ms == 0 || self.block_idle_timeout_ms == 0 {
            return Err(OsaError::Configuration(
                "timeouts must be greater than zero".into(),
            ));
        }
        if self.max_retries == 0 {
            return Err(OsaError::Configuration("max_retries must be at least 1".into()));
        }
        if !self.terminator.ends_with(['\r', '\n']) {
            return Err(OsaError::Configuration(format!(
                "terminator {:?} must end in CR or LF",
                self.terminator
            )));
        }
        Ok(())
    }

    /// Reply timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Longest gap allowed between chunks of a binary block.
    pub fn block_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.block_idle_timeout_ms)
    }

    /// Trace decoder matching `strict_scale_mode`.
    pub fn decoder(&self) -> TraceDecoder {
        if self.strict_scale_mode {
            TraceDecoder::new(ScalePolicy::Strict)
        } else {
            TraceDecoder::new(ScalePolicy::Lenient)
        }
    }
}
