//! Core types for the rust-osa optical spectrum analyzer driver.
//!
//! - [`trace`]: the binary trace codec (`TraceDecoder`), pure and stateless.
//! - [`settings`]: closed-set and range-checked instrument settings.
//! - [`transport`]: the `OsaTransport` capability the driver is written against.
//! - [`error`]: `DecodeError` and `OsaError`.

/// Decode and driver error types.
pub mod error;
/// Typed instrument settings and their limits.
pub mod settings;
/// Binary trace decoding.
pub mod trace;
/// Transport abstraction shared by real and mock links.
pub mod transport;

pub use error::{DecodeError, OsaError, OsaResult};
pub use trace::{
    twos_complement, DecodedTrace, RangeDescriptor, ScaleMode, ScalePolicy, TraceDecoder,
};
pub use transport::OsaTransport;
