//! Serial driver for benchtop optical spectrum analyzers.
//!
//! - [`OsaDriver`]: typed settings, sweep control and trace readout
//! - [`SerialTransport`]: ASCII command link with binary block reads
//! - [`OsaConfig`]: link and decoding settings
//! - [`MockTransport`](mock::MockTransport) and [`mock_serial`]: test doubles
//!
//! ```rust,ignore
//! use osa_driver::{OsaConfig, OsaDriver, Property};
//!
//! let driver = OsaDriver::connect_serial(&OsaConfig::new("/dev/ttyUSB0")).await?;
//! driver.set_property(Property::Span, "20").await?;
//! println!("{}", driver.get_property(Property::CenterWavelength).await?);
//! ```

/// Instrument link configuration.
pub mod config;
/// In-memory transport for tests.
pub mod mock;
/// Byte-level serial harness for tests.
pub mod mock_serial;
/// The command table.
pub mod osa;
/// Settings addressed by name.
pub mod property;
/// RS-232 transport.
pub mod serial;

pub use config::OsaConfig;
pub use osa::OsaDriver;
pub use property::Property;
pub use serial::{list_ports, SerialTransport};

pub use osa_core::{DecodedTrace, OsaError, OsaResult, ScaleMode, ScalePolicy, TraceDecoder};
