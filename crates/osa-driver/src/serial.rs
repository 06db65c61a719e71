//! Serial transport for the analyzer's ASCII command set.
//!
//! Protocol overview:
//! - Commands are short mnemonics (`CNT 1550.00`, `SSI`), queries end in `?`
//! - Default framing: 9600 baud 8N1, commands terminated by CR/LF
//! - Text replies are a single line terminated by LF (usually CR/LF)
//! - Binary dumps (`DBA?`, `DBB?`) are a headerless block of fixed-width
//!   records followed by CR/LF; the block itself may contain any byte,
//!   including `\n`, so it is read by length rather than by line
//!
//! At 9600 baud a 5001-point linear dump (20 004 bytes) takes about 21 s, so
//! binary reads are bounded by an idle gap between chunks, not by a deadline
//! for the whole block.

use crate::config::OsaConfig;
use async_trait::async_trait;
use osa_core::{OsaError, OsaResult, OsaTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use tokio::time::{timeout, Instant};
use tokio_serial::SerialPortBuilderExt;

/// Anything the transport can drive: a real port or a test duplex.
pub trait SerialPortIO: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPortIO for T {}
type DynSerial = Box<dyn SerialPortIO>;
/// Buffered port shared between commands.
pub type SharedPort = Arc<Mutex<BufReader<DynSerial>>>;

const BASE_BACKOFF_MS: u64 = 100;
const DRAIN_POLL: Duration = Duration::from_millis(5);
const DRAIN_WINDOW: Duration = Duration::from_millis(50);
const TERMINATOR_WAIT: Duration = Duration::from_millis(50);
/// Upper bound on the buffer reserved before a block arrives; larger blocks grow.
const MAX_PREALLOCATION: usize = 64 * 1024;

/// Command/response link over a serial port.
pub struct SerialTransport {
    port: SharedPort,
    port_name: String,
    terminator: String,
    timeout: Duration,
    idle_timeout: Duration,
    max_retries: u32,
    local_command: Option<String>,
}

impl SerialTransport {
    /// Open the serial port described by `config`.
    ///
    /// # Errors
    /// Returns `OsaError::Io` if the port cannot be opened.
    pub async fn open(config: &OsaConfig) -> OsaResult<Self> {
        let port_path = config.port.clone();
        let baud_rate = config.baud_rate;

        let port = spawn_blocking(move || {
            tokio_serial::new(&port_path, baud_rate)
                .data_bits(tokio_serial::DataBits::Eight)
                .parity(tokio_serial::Parity::None)
                .stop_bits(tokio_serial::StopBits::One)
                .flow_control(tokio_serial::FlowControl::None)
                .open_native_async()
        })
        .await
        .map_err(|e| OsaError::Io(std::io::Error::other(e)))?
        .map_err(std::io::Error::from)?;

        tracing::info!(
            port = %config.port,
            baud = config.baud_rate,
            "Opened spectrum analyzer serial port"
        );

        Ok(Self::from_port(port, &config.port).with_config(config))
    }

    /// Wrap an already open port (or a test double).
    pub fn from_port<P: SerialPortIO + 'static>(port: P, name: &str) -> Self {
        let port: DynSerial = Box::new(port);
        Self {
            port: Arc::new(Mutex::new(BufReader::new(port))),
            port_name: name.to_string(),
            terminator: "\r\n".to_string(),
            timeout: Duration::from_millis(15_000),
            idle_timeout: Duration::from_millis(1_000),
            max_retries: 3,
            local_command: None,
        }
    }

    /// Apply framing and timing settings from a config.
    pub fn with_config(self, config: &OsaConfig) -> Self {
        self.with_terminator(&config.terminator)
            .with_timeout(config.timeout())
            .with_idle_timeout(config.block_idle_timeout())
            .with_retries(config.max_retries)
            .with_local_command(config.local_command.clone())
    }

    /// Set the command terminator.
    pub fn with_terminator(mut self, terminator: &str) -> Self {
        self.terminator = terminator.to_string();
        self
    }

    /// Set the reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the longest silence tolerated inside a binary block.
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = idle;
        self
    }

    /// Set how many times a query is attempted (at least once).
    pub fn with_retries(mut self, attempts: u32) -> Self {
        self.max_retries = attempts.max(1);
        self
    }

    /// Command that releases remote control, e.g. `++loc` on a GPIB bridge.
    pub fn with_local_command(mut self, command: Option<String>) -> Self {
        self.local_command = command;
        self
    }

    /// Discard stale input left over from an earlier, abandoned exchange.
    async fn drain_input(port: &mut BufReader<DynSerial>) {
        let buffered = port.buffer().len();
        if buffered > 0 {
            tracing::debug!(bytes = buffered, "Discarding buffered serial input");
            port.consume(buffered);
        }

        let mut discard = [0u8; 256];
        let deadline = Instant::now() + DRAIN_WINDOW;
        let mut quiet_polls = 0u32;
        while quiet_polls < 3 && Instant::now() < deadline {
            match timeout(DRAIN_POLL, port.get_mut().read(&mut discard)).await {
                Ok(Ok(0)) | Err(_) => quiet_polls += 1,
                Ok(Ok(n)) => {
                    quiet_polls = 0;
                    tracing::debug!(bytes = n, "Discarding stale serial input");
                }
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::WouldBlock => quiet_polls += 1,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Serial I/O error while draining input");
                    break;
                }
            }
        }
    }

    async fn send(&self, port: &mut BufReader<DynSerial>, command: &str) -> OsaResult<()> {
        let framed = format!("{command}{}", self.terminator);
        tracing::debug!(cmd = %command, "Sending command");
        let stream = port.get_mut();
        stream.write_all(framed.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn query_once(&self, command: &str) -> OsaResult<String> {
        let mut port = self.port.lock().await;
        Self::drain_input(&mut port).await;
        self.send(&mut port, command).await?;

        let deadline = Instant::now() + self.timeout;
        let mut line = String::new();
        loop {
            line.clear();
            match tokio::time::timeout_at(deadline, port.read_line(&mut line)).await {
                Ok(Ok(0)) => {
                    return Err(OsaError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "serial link closed",
                    )))
                }
                Ok(Ok(_)) => {
                    let reply = line.trim();
                    if reply.is_empty() {
                        continue;
                    }
                    tracing::debug!(cmd = %command, reply = %reply, "Received reply");
                    return Ok(reply.to_string());
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(OsaError::Timeout {
                        command: command.to_string(),
                        timeout: self.timeout,
                    })
                }
            }
        }
    }

    /// Swallow the CR/LF that follows a complete binary block.
    async fn consume_block_terminator(port: &mut BufReader<DynSerial>) {
        for _ in 0..2 {
            let next = match timeout(TERMINATOR_WAIT, port.fill_buf()).await {
                Ok(Ok(buf)) => buf.first().copied(),
                _ => None,
            };
            match next {
                Some(b'\r') | Some(b'\n') => port.consume(1),
                _ => break,
            }
        }
    }
}

#[async_trait]
impl OsaTransport for SerialTransport {
    async fn write(&self, command: &str) -> OsaResult<()> {
        let mut port = self.port.lock().await;
        self.send(&mut port, command).await
    }

    /// Query with retry on link errors (linear backoff).
    async fn query(&self, command: &str) -> OsaResult<String> {
        let mut attempt = 0;
        loop {
            match self.query_once(command).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_transient() && attempt + 1 < self.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * u64::from(attempt));
                    tracing::debug!(
                        cmd = %command,
                        attempt,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying query after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn read_raw(&self, expected_len: usize) -> OsaResult<Vec<u8>> {
        let mut port = self.port.lock().await;
        let mut block = Vec::with_capacity(expected_len.min(MAX_PREALLOCATION));
        let mut chunk = [0u8; 1024];

        while block.len() < expected_len {
            // The instrument may take a while to start the dump; after that the
            // bytes should keep flowing.
            let wait = if block.is_empty() {
                self.timeout
            } else {
                self.idle_timeout
            };
            let want = chunk.len().min(expected_len - block.len());
            match timeout(wait, port.read(&mut chunk[..want])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => block.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => break,
            }
        }

        if block.is_empty() && expected_len > 0 {
            return Err(OsaError::Timeout {
                command: "binary block".to_string(),
                timeout: self.timeout,
            });
        }

        if block.len() == expected_len {
            Self::consume_block_terminator(&mut port).await;
        } else {
            tracing::warn!(
                expected = expected_len,
                received = block.len(),
                "Binary block ended early"
            );
        }

        tracing::debug!(bytes = block.len(), "Read binary block");
        Ok(block)
    }

    async fn go_to_local(&self) -> OsaResult<()> {
        match &self.local_command {
            Some(command) => self.write(command).await,
            None => Err(OsaError::Unsupported(
                "go to local (no local_command configured for this serial link)",
            )),
        }
    }

    fn describe(&self) -> String {
        format!("SerialTransport({})", self.port_name)
    }
}

/// Names of the serial ports present on this machine.
pub fn list_ports() -> OsaResult<Vec<String>> {
    let ports = serialport::available_ports().map_err(std::io::Error::from)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
