//! Instrument link abstraction.
//!
//! The driver never talks to a port directly; it goes through an
//! [`OsaTransport`], which lets tests substitute a scripted transport and keeps
//! framing details (terminators, timeouts, retries) out of the command table.

use crate::error::{OsaError, OsaResult};
use async_trait::async_trait;

/// Command/response link to the analyzer.
///
/// Implementations must be safe to share between tasks; the driver holds them
/// behind an `Arc` and relies on the transport to serialise access to the
/// underlying port.
#[async_trait]
pub trait OsaTransport: Send + Sync {
    /// Send a command that produces no reply.
    async fn write(&self, command: &str) -> OsaResult<()>;

    /// Send a query and return its single-line reply without line ending.
    async fn query(&self, command: &str) -> OsaResult<String>;

    /// Read a binary block of `expected_len` bytes following a dump command.
    ///
    /// If the link goes quiet early, the bytes received so far are returned so
    /// the caller can report the short payload. An empty read is a timeout.
    async fn read_raw(&self, expected_len: usize) -> OsaResult<Vec<u8>>;

    /// Release remote control and return the front panel to the operator.
    async fn go_to_local(&self) -> OsaResult<()> {
        Err(OsaError::Unsupported("go to local"))
    }

    /// Human-readable description of the link, for logs.
    fn describe(&self) -> String;
}
