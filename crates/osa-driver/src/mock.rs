//! Scripted transport for testing the command table without a serial link.
//!
//! `MockTransport` answers queries from a register map and records every
//! operation. Writing `XXX value` stores `value` as the reply to `XXX?`, so a
//! setter followed by the matching getter behaves like the real instrument.
//!
//! # Example
//!
//! ```
//! use osa_driver::mock::MockTransport;
//! use osa_core::OsaTransport;
//!
//! # tokio_test_block_on(async {
//! let mock = MockTransport::new().with_response("CNT?", "1550.00");
//! assert_eq!(mock.query("CNT?").await.unwrap(), "1550.00");
//! mock.write("CNT 1310.00").await.unwrap();
//! assert_eq!(mock.query("CNT?").await.unwrap(), "1310.00");
//! assert_eq!(mock.call_log(), vec!["CNT?", "CNT 1310.00", "CNT?"]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use async_trait::async_trait;
use osa_core::{OsaError, OsaResult, OsaTransport};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// In-memory stand-in for an analyzer link.
#[derive(Default)]
pub struct MockTransport {
    registers: Mutex<HashMap<String, String>>,
    blocks: Mutex<VecDeque<Vec<u8>>>,
    call_log: Mutex<Vec<String>>,
    should_fail_next: AtomicBool,
    supports_local: bool,
}

impl MockTransport {
    /// Empty register map, no queued blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload the reply to a query.
    pub fn with_response(self, query: &str, reply: &str) -> Self {
        self.set_response(query, reply);
        self
    }

    /// Queue a binary block for the next `read_raw`.
    pub fn with_block(self, block: Vec<u8>) -> Self {
        self.push_block(block);
        self
    }

    /// Accept `go_to_local` instead of reporting it unsupported.
    pub fn with_local_support(mut self) -> Self {
        self.supports_local = true;
        self
    }

    /// Reply `reply` to `query` until it is overwritten.
    pub fn set_response(&self, query: &str, reply: &str) {
        self.registers
            .lock()
            .insert(query.to_string(), reply.to_string());
    }

    /// Queue a block for the next `read_raw`.
    pub fn push_block(&self, block: Vec<u8>) {
        self.blocks.lock().push_back(block);
    }

    /// Make the next operation fail with a timeout.
    pub fn trigger_failure(&self) {
        self.should_fail_next.store(true, Ordering::SeqCst);
    }

    /// Every command, query and read, in order.
    pub fn call_log(&self) -> Vec<String> {
        self.call_log.lock().clone()
    }

    /// Forget every recorded call.
    pub fn clear_call_log(&self) {
        self.call_log.lock().clear();
    }

    /// Number of operations performed so far.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().len()
    }

    fn record(&self, entry: String) -> OsaResult<()> {
        self.call_log.lock().push(entry.clone());
        if self.should_fail_next.swap(false, Ordering::SeqCst) {
            return Err(OsaError::Timeout {
                command: entry,
                timeout: Duration::ZERO,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OsaTransport for MockTransport {
    async fn write(&self, command: &str) -> OsaResult<()> {
        self.record(command.to_string())?;
        if let Some((mnemonic, value)) = command.split_once(' ') {
            self.set_response(&format!("{mnemonic}?"), value.trim());
        }
        Ok(())
    }

    async fn query(&self, command: &str) -> OsaResult<String> {
        self.record(command.to_string())?;
        self.registers
            .lock()
            .get(command)
            .cloned()
            .ok_or_else(|| OsaError::Timeout {
                command: command.to_string(),
                timeout: Duration::ZERO,
            })
    }

    async fn read_raw(&self, expected_len: usize) -> OsaResult<Vec<u8>> {
        self.record(format!("<read {expected_len} bytes>"))?;
        self.blocks.lock().pop_front().ok_or(OsaError::Timeout {
            command: "binary block".to_string(),
            timeout: Duration::ZERO,
        })
    }

    async fn go_to_local(&self) -> OsaResult<()> {
        self.record("<go to local>".to_string())?;
        if self.supports_local {
            Ok(())
        } else {
            Err(OsaError::Unsupported("go to local"))
        }
    }

    fn describe(&self) -> String {
        "MockTransport".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_query_times_out() {
        let mock = MockTransport::new();
        assert!(matches!(
            mock.query("XYZ?").await,
            Err(OsaError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn failure_is_one_shot() {
        let mock = MockTransport::new().with_response("MOD?", "0");
        mock.trigger_failure();
        assert!(mock.query("MOD?").await.is_err());
        assert_eq!(mock.query("MOD?").await.unwrap(), "0");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn blocks_are_served_in_order() {
        let mock = MockTransport::new()
            .with_block(vec![1, 2])
            .with_block(vec![3, 4]);
        assert_eq!(mock.read_raw(2).await.unwrap(), vec![1, 2]);
        assert_eq!(mock.read_raw(2).await.unwrap(), vec![3, 4]);
        assert!(mock.read_raw(2).await.is_err());
        assert_eq!(mock.call_log()[0], "<read 2 bytes>");
    }

    #[tokio::test]
    async fn commands_without_arguments_do_not_touch_registers() {
        let mock = MockTransport::new();
        mock.write("SSI").await.unwrap();
        assert!(mock.query("SSI?").await.is_err());
        mock.clear_call_log();
        assert!(mock.call_log().is_empty());
    }

    #[tokio::test]
    async fn local_support_is_opt_in() {
        assert!(MockTransport::new().go_to_local().await.is_err());
        assert!(MockTransport::new()
            .with_local_support()
            .go_to_local()
            .await
            .is_ok());
    }
}
