//! # rust-osa
//!
//! Application layer for the `rust-osa` command-line tool. The instrument
//! protocol lives in the workspace crates:
//!
//! - **`osa-core`**: binary trace decoding, instrument setting types, errors and
//!   the `OsaTransport` trait.
//! - **`osa-driver`**: serial transport, the typed `OsaDriver` command table and
//!   test doubles.
//!
//! This crate adds:
//!
//! - **`config`**: Figment-based loading of `config/osa.toml` with `RUST_OSA_`
//!   environment overrides.
//! - **`logging`**: `tracing-subscriber` setup (pretty, compact or JSON).
//! - **`export`**: CSV and JSON writers for decoded traces.

/// Application configuration.
pub mod config;
/// Trace writers.
pub mod export;
/// Tracing setup.
pub mod logging;

pub use osa_core;
pub use osa_driver;
