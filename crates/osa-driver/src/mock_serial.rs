//! In-memory serial link for wire-level tests.
//!
//! [`pair`] returns the host end of a `tokio::io::duplex` stream, which can be
//! handed to [`SerialTransport::from_port`](crate::serial::SerialTransport::from_port),
//! and a [`DeviceHarness`] that plays the instrument: it reads the commands the
//! host sends and answers with text lines or binary blocks.
//!
//! ```rust,ignore
//! let (port, mut device) = mock_serial::pair();
//! let transport = SerialTransport::from_port(port, "mock");
//!
//! let host = tokio::spawn(async move { transport.query("CNT?").await });
//! device.expect_command("CNT?").await;
//! device.reply("1550.00").await;
//! assert_eq!(host.await??, "1550.00");
//! ```

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::time::timeout;

/// Capacity of each direction; large enough for a 5001-point linear dump.
const LINK_BUFFER: usize = 64 * 1024;

/// How long the harness waits for the host before failing the test.
const HARNESS_TIMEOUT: Duration = Duration::from_secs(2);

/// Create a connected host port and device harness.
pub fn pair() -> (DuplexStream, DeviceHarness) {
    let (host, device) = tokio::io::duplex(LINK_BUFFER);
    (
        host,
        DeviceHarness {
            stream: device,
            received: Vec::new(),
        },
    )
}

/// Instrument side of a mock link.
#[derive(Debug)]
pub struct DeviceHarness {
    stream: DuplexStream,
    received: Vec<u8>,
}

impl DeviceHarness {
    /// Next command sent by the host, without its line ending.
    ///
    /// # Panics
    /// If no complete line arrives within two seconds or the host hangs up.
    pub async fn next_command(&mut self) -> String {
        loop {
            if let Some(end) = self.received.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.received.drain(..=end).collect();
                return String::from_utf8_lossy(&line).trim_end().to_string();
            }

            let mut chunk = [0u8; 256];
            match timeout(HARNESS_TIMEOUT, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) => panic!("host closed the link while a command was expected"),
                Ok(Ok(n)) => self.received.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => panic!("mock link read failed: {e}"),
                Err(_) => panic!(
                    "timed out waiting for a command; partial input {:?}",
                    String::from_utf8_lossy(&self.received)
                ),
            }
        }
    }

    /// Assert that the next command equals `expected`.
    pub async fn expect_command(&mut self, expected: &str) {
        let got = self.next_command().await;
        assert_eq!(got, expected, "unexpected command on the link");
    }

    /// Send a text reply terminated by CR/LF.
    pub async fn reply(&mut self, line: &str) {
        self.send_bytes(format!("{line}\r\n").as_bytes()).await;
    }

    /// Send raw bytes (binary trace blocks, stray noise).
    pub async fn send_bytes(&mut self, data: &[u8]) {
        if let Err(e) = self.stream.write_all(data).await {
            panic!("mock link write failed: {e}");
        }
    }

    /// Bytes the host wrote that have not been consumed as commands.
    pub fn unread(&self) -> &[u8] {
        &self.received
    }
}
