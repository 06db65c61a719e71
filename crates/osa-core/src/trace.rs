//! Binary trace codec.
//!
//! The analyzer dumps a trace memory (`DBA?` / `DBB?`) as a packed block of
//! fixed-width big-endian records with no header. What the records mean
//! depends on the current level scale:
//!
//! | Scale | Width | Layout                                   | Unit |
//! |-------|-------|------------------------------------------|------|
//! | LOG   | 2     | `i16` hundredths of a dBm                | dBm  |
//! | LIN   | 4     | `i16` decimal exponent, `u16` mantissa / 10⁴ | mW   |
//!
//! The wavelength axis is not part of the payload. It comes from the range
//! descriptor (`DCA?` / `DCB?`), `"start,stop,count"`, and is rebuilt as an
//! evenly spaced grid from `start` to `stop` inclusive.
//!
//! # Example
//!
//! ```
//! use osa_core::trace::{ScaleMode, TraceDecoder};
//!
//! let trace = TraceDecoder::default()
//!     .decode(&[233, 162, 0, 0], "LOG 0.5dB/DIV", "1500,1500.5,2")
//!     .unwrap();
//!
//! assert_eq!(trace.mode, ScaleMode::Logarithmic);
//! assert_eq!(trace.wavelengths, vec![1500.0, 1500.5]);
//! assert_eq!(trace.powers, vec![-57.26, 0.0]);
//! ```

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interpret the low `bits` bits of `value` as a two's-complement integer.
///
/// `bits` must be in `1..=32`; `value` must fit in `bits` bits.
pub fn twos_complement(value: u32, bits: u32) -> i64 {
    debug_assert!((1..=32).contains(&bits));
    let value = i64::from(value);
    if value >> (bits - 1) != 0 {
        value - (1i64 << bits)
    } else {
        value
    }
}

// =============================================================================
// ScaleMode
// =============================================================================

/// Level scale of a trace, which fixes its record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleMode {
    /// 2-byte records in dBm.
    #[serde(rename = "LOG")]
    Logarithmic,
    /// 4-byte records in mW.
    #[serde(rename = "LIN")]
    Linear,
}

impl ScaleMode {
    /// Classify an `LVS?` reply. Anything containing `"LOG"` is logarithmic.
    pub fn from_token(token: &str) -> Self {
        if token.contains("LOG") {
            ScaleMode::Logarithmic
        } else {
            ScaleMode::Linear
        }
    }

    /// Bytes per sample in a binary dump.
    pub fn record_width(self) -> usize {
        match self {
            ScaleMode::Logarithmic => 2,
            ScaleMode::Linear => 4,
        }
    }

    /// Physical unit of decoded power values.
    pub fn unit(self) -> &'static str {
        match self {
            ScaleMode::Logarithmic => "dBm",
            ScaleMode::Linear => "mW",
        }
    }

    /// Instrument mnemonic for the scale.
    pub fn as_token(self) -> &'static str {
        match self {
            ScaleMode::Logarithmic => "LOG",
            ScaleMode::Linear => "LIN",
        }
    }

    /// Decode one record; `None` when a linear record overflows `f64`.
    fn decode_record(self, record: &[u8]) -> Option<f64> {
        match self {
            ScaleMode::Logarithmic => {
                let raw = u16::from_be_bytes([record[0], record[1]]);
                // Divide rather than multiply by 1e-2 so that e.g. -5726 lands on
                // the nearest double to -57.26.
                Some(twos_complement(u32::from(raw), 16) as f64 / 100.0)
            }
            ScaleMode::Linear => {
                let exponent = record_exponent(record);
                let mantissa = f64::from(u16::from_be_bytes([record[2], record[3]])) / 10_000.0;
                Some(scale_by_decade(mantissa, exponent)).filter(|v| v.is_finite())
            }
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// `mantissa * 10^exponent`, dividing for negative exponents so that exact
/// decimal results such as 1e-9 are not perturbed by a rounded reciprocal.
fn scale_by_decade(mantissa: f64, exponent: i64) -> f64 {
    if mantissa == 0.0 {
        return 0.0;
    }
    // |exponent| <= 32768 for 16-bit fields, well inside i32.
    let magnitude = 10f64.powi(exponent.unsigned_abs() as i32);
    if exponent < 0 {
        mantissa / magnitude
    } else {
        mantissa * magnitude
    }
}

fn record_exponent(record: &[u8]) -> i64 {
    twos_complement(u32::from(u16::from_be_bytes([record[0], record[1]])), 16)
}

// =============================================================================
// RangeDescriptor
// =============================================================================

/// Wavelength axis of a trace memory, as reported by `DCA?` / `DCB?`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeDescriptor {
    /// First axis point (nm).
    pub start: f64,
    /// Last axis point (nm). May be below `start`.
    pub stop: f64,
    /// Number of samples, always positive.
    pub sample_count: usize,
}

impl RangeDescriptor {
    /// Build a descriptor, rejecting a zero sample count or non-finite endpoints.
    pub fn new(start: f64, stop: f64, sample_count: usize) -> Result<Self, DecodeError> {
        let text = format!("{start},{stop},{sample_count}");
        if sample_count == 0 {
            return Err(DecodeError::malformed(&text, "sample count must be positive"));
        }
        if !start.is_finite() || !stop.is_finite() {
            return Err(DecodeError::malformed(&text, "endpoints must be finite"));
        }
        Ok(Self {
            start,
            stop,
            sample_count,
        })
    }

    /// Expected payload size for a scale mode.
    ///
    /// Fails with `MalformedRange` when the size does not fit in `usize`.
    pub fn payload_len(&self, mode: ScaleMode) -> Result<usize, DecodeError> {
        self.sample_count
            .checked_mul(mode.record_width())
            .ok_or_else(|| {
                DecodeError::malformed(
                    &format!("{},{},{}", self.start, self.stop, self.sample_count),
                    "sample count too large",
                )
            })
    }

    /// Evenly spaced axis from `start` to `stop` inclusive.
    pub fn axis(&self) -> Vec<f64> {
        let n = self.sample_count;
        if n == 1 {
            return vec![self.start];
        }
        let step = (self.stop - self.start) / (n - 1) as f64;
        let mut axis: Vec<f64> = (0..n).map(|i| self.start + i as f64 * step).collect();
        // Pin the endpoint; accumulated rounding must not move it.
        axis[n - 1] = self.stop;
        axis
    }
}

impl FromStr for RangeDescriptor {
    type Err = DecodeError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = descriptor.trim().split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(DecodeError::malformed(
                descriptor,
                format!("expected 3 comma-separated fields, found {}", fields.len()),
            ));
        }

        let number = |name: &str, field: &str| {
            field.parse::<f64>().map_err(|_| {
                DecodeError::malformed(descriptor, format!("{name} '{field}' is not a number"))
            })
        };
        let start = number("start", fields[0])?;
        let stop = number("stop", fields[1])?;
        let count = number("sample count", fields[2])?;

        if !count.is_finite() || count.fract() != 0.0 {
            return Err(DecodeError::malformed(
                descriptor,
                format!("sample count '{}' is not a whole number", fields[2]),
            ));
        }
        if count < 1.0 {
            return Err(DecodeError::malformed(descriptor, "sample count must be positive"));
        }
        if count >= usize::MAX as f64 {
            return Err(DecodeError::malformed(descriptor, "sample count too large"));
        }

        RangeDescriptor::new(start, stop, count as usize)
            .map_err(|_| DecodeError::malformed(descriptor, "endpoints must be finite"))
    }
}

// =============================================================================
// DecodedTrace
// =============================================================================

/// A fully decoded trace: `wavelengths[i]` pairs with `powers[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedTrace {
    /// Axis in nm.
    pub wavelengths: Vec<f64>,
    /// Power in dBm (logarithmic) or mW (linear).
    pub powers: Vec<f64>,
    /// Scale the payload was decoded with.
    pub mode: ScaleMode,
}

impl DecodedTrace {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.powers.len()
    }

    /// True for a trace without samples (never produced by the decoder).
    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }

    /// Unit of the power column.
    pub fn power_unit(&self) -> &'static str {
        self.mode.unit()
    }

    /// Iterate `(wavelength, power)` pairs in record order.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.wavelengths.iter().copied().zip(self.powers.iter().copied())
    }

    /// Sample with the highest power, if any.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.samples()
            .filter(|(_, p)| !p.is_nan())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

// =============================================================================
// TraceDecoder
// =============================================================================

/// How to treat scale tokens that name neither `LOG` nor `LIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalePolicy {
    /// Treat as linear and log a warning.
    #[default]
    Lenient,
    /// Reject with [`DecodeError::UnsupportedScaleMode`].
    Strict,
}

/// Stateless decoder for binary trace dumps.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceDecoder {
    policy: ScalePolicy,
}

impl TraceDecoder {
    /// Decoder with the given unknown-token policy.
    pub fn new(policy: ScalePolicy) -> Self {
        Self { policy }
    }

    /// Decoder that rejects unrecognised scale tokens.
    pub fn strict() -> Self {
        Self::new(ScalePolicy::Strict)
    }

    /// Active policy.
    pub fn policy(&self) -> ScalePolicy {
        self.policy
    }

    /// Resolve an `LVS?` reply according to the policy.
    pub fn resolve_scale(&self, scale_token: &str) -> Result<ScaleMode, DecodeError> {
        let mode = ScaleMode::from_token(scale_token);
        if mode == ScaleMode::Linear && !scale_token.contains("LIN") {
            match self.policy {
                ScalePolicy::Strict => {
                    return Err(DecodeError::UnsupportedScaleMode(scale_token.trim().to_string()))
                }
                ScalePolicy::Lenient => tracing::warn!(
                    token = %scale_token.trim(),
                    "Unrecognised scale token, decoding as linear"
                ),
            }
        }
        Ok(mode)
    }

    /// Decode a raw dump given the `LVS?` and `DCx?` replies that describe it.
    pub fn decode(
        &self,
        raw: &[u8],
        scale_token: &str,
        range_token: &str,
    ) -> Result<DecodedTrace, DecodeError> {
        let mode = self.resolve_scale(scale_token)?;
        let range: RangeDescriptor = range_token.parse()?;
        self.decode_with(raw, mode, &range)
    }

    /// Decode a raw dump with an already resolved scale and range.
    pub fn decode_with(
        &self,
        raw: &[u8],
        mode: ScaleMode,
        range: &RangeDescriptor,
    ) -> Result<DecodedTrace, DecodeError> {
        let expected = range.payload_len(mode)?;
        if raw.len() != expected {
            return Err(DecodeError::TruncatedPayload {
                expected,
                actual: raw.len(),
                mode,
            });
        }

        let powers = raw
            .chunks_exact(mode.record_width())
            .enumerate()
            .map(|(index, record)| {
                mode.decode_record(record)
                    .ok_or(DecodeError::NonFiniteSample {
                        index,
                        exponent: record_exponent(record),
                    })
            })
            .collect::<Result<Vec<f64>, DecodeError>>()?;

        tracing::debug!(
            %mode,
            samples = powers.len(),
            start = range.start,
            stop = range.stop,
            "Decoded binary trace"
        );

        Ok(DecodedTrace {
            wavelengths: range.axis(),
            powers,
            mode,
        })
    }
}
