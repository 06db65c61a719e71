//! Typed instrument settings.
//!
//! Every discrete setting of the analyzer is a closed enum so an invalid
//! choice cannot be expressed, and every continuous setting is a validated
//! range. Each type knows the token the instrument uses for it on the wire,
//! both when writing a command and when parsing a query reply.

use crate::error::OsaError;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Declares a closed setting with its wire tokens.
///
/// Generates `ALL`, `as_token`, `Display` and a `FromStr` that accepts the
/// token with surrounding whitespace (query replies end in CR/LF).
macro_rules! instrument_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($property:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $token:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* #[doc = concat!("`", $token, "`")] $variant ),+
        }

        impl $name {
            /// Every value, in instrument order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Token sent to and received from the instrument.
            pub fn as_token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_token())
            }
        }

        impl FromStr for $name {
            type Err = OsaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_token().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = $name::ALL.iter().map(|v| v.as_token()).collect();
                        OsaError::invalid($property, s, format!("expected one of {}", allowed.join(", ")))
                    })
            }
        }
    };
}

instrument_enum! {
    /// Marker readout unit.
    MarkerValue("marker value") {
        Wavelength => "WL",
        Frequency => "FREQ",
    }
}

instrument_enum! {
    /// Generic on/off switch (optical attenuator, max hold).
    Switch("switch") {
        On => "ON",
        Off => "OFF",
    }
}

instrument_enum! {
    /// Resolution bandwidth in nm.
    Resolution("resolution") {
        Nm0_05 => "0.05",
        Nm0_07 => "0.07",
        Nm0_10 => "0.10",
        Nm0_20 => "0.20",
        Nm0_50 => "0.50",
        Nm1_00 => "1.00",
    }
}

impl Resolution {
    /// Resolution in nm.
    pub fn nm(self) -> f64 {
        match self {
            Resolution::Nm0_05 => 0.05,
            Resolution::Nm0_07 => 0.07,
            Resolution::Nm0_10 => 0.10,
            Resolution::Nm0_20 => 0.20,
            Resolution::Nm0_50 => 0.50,
            Resolution::Nm1_00 => 1.00,
        }
    }

    /// Parse a numeric reply such as `"0.1"` or `"1"`.
    pub fn from_nm(nm: f64) -> Result<Self, OsaError> {
        Resolution::ALL
            .iter()
            .copied()
            .find(|r| (r.nm() - nm).abs() < 1e-9)
            .ok_or_else(|| OsaError::invalid("resolution", nm, "not a supported resolution"))
    }
}

instrument_enum! {
    /// Video bandwidth.
    VideoBandwidth("video bandwidth") {
        Hz10 => "10HZ",
        Hz100 => "100HZ",
        KHz1 => "1KHZ",
        KHz100 => "100KHZ",
        MHz1 => "1MHZ",
    }
}

instrument_enum! {
    /// Trace smoothing window.
    Smoothing("smoothing") {
        Off => "OFF",
        Points3 => "3",
        Points5 => "5",
        Points7 => "7",
        Points9 => "9",
        Points11 => "11",
    }
}

instrument_enum! {
    /// Samples per sweep.
    SamplingPoints("sampling points") {
        P51 => "51",
        P101 => "101",
        P251 => "251",
        P501 => "501",
        P1001 => "1001",
        P2001 => "2001",
        P5001 => "5001",
    }
}

impl SamplingPoints {
    /// Number of samples.
    pub fn count(self) -> usize {
        match self {
            SamplingPoints::P51 => 51,
            SamplingPoints::P101 => 101,
            SamplingPoints::P251 => 251,
            SamplingPoints::P501 => 501,
            SamplingPoints::P1001 => 1001,
            SamplingPoints::P2001 => 2001,
            SamplingPoints::P5001 => 5001,
        }
    }
}

instrument_enum! {
    /// Peak/dip search step.
    SearchMode("search mode") {
        Peak => "PEAK",
        Next => "NEXT",
        Last => "LAST",
        Left => "LEFT",
        Right => "RIGHT",
    }
}

instrument_enum! {
    /// Trace memory.
    Memory("memory") {
        A => "A",
        B => "B",
    }
}

impl Memory {
    /// Mnemonic suffix used by per-memory queries (`DBA?`, `DCB?`, ...).
    pub fn suffix(self) -> char {
        match self {
            Memory::A => 'A',
            Memory::B => 'B',
        }
    }
}

instrument_enum! {
    /// Displayed trace combination.
    TraceSelect("trace select") {
        A => "A",
        B => "B",
        AB => "AB",
        AMinusB => "A_B",
        BMinusA => "B_A",
    }
}

instrument_enum! {
    /// Dynamic range mode.
    DynamicRange("dynamic range") {
        Normal => "NORMAL",
        High => "HIGH",
    }
}

// =============================================================================
// Averaging
// =============================================================================

/// Point or sweep averaging: off, or a count in 2..=1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Averaging {
    /// Averaging disabled (`OFF`).
    Off,
    /// Average over this many samples.
    Count(u16),
}

impl Averaging {
    /// Counts the instrument accepts.
    pub const COUNT_RANGE: RangeInclusive<u16> = 2..=1000;

    /// Averaging over `count` sweeps or points.
    pub fn count(count: u16) -> Result<Self, OsaError> {
        if Self::COUNT_RANGE.contains(&count) {
            Ok(Averaging::Count(count))
        } else {
            Err(OsaError::invalid("averaging", count, "count must be 2 to 1000"))
        }
    }
}

impl fmt::Display for Averaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Averaging::Off => f.write_str("OFF"),
            Averaging::Count(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Averaging {
    type Err = OsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("OFF") {
            return Ok(Averaging::Off);
        }
        let n: u16 = s
            .parse()
            .map_err(|_| OsaError::invalid("averaging", s, "expected OFF or a count"))?;
        Averaging::count(n)
    }
}

// =============================================================================
// LinearScale
// =============================================================================

/// Power unit prefix used by the linear level scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerUnit {
    /// pW
    PicoWatt,
    /// nW
    NanoWatt,
    /// uW
    MicroWatt,
    /// mW
    MilliWatt,
    /// W
    Watt,
}

impl PowerUnit {
    const ALL: [PowerUnit; 5] = [
        PowerUnit::PicoWatt,
        PowerUnit::NanoWatt,
        PowerUnit::MicroWatt,
        PowerUnit::MilliWatt,
        PowerUnit::Watt,
    ];

    /// Unit suffix used on the wire (`PW` .. `W`).
    pub fn as_token(self) -> &'static str {
        match self {
            PowerUnit::PicoWatt => "PW",
            PowerUnit::NanoWatt => "NW",
            PowerUnit::MicroWatt => "UW",
            PowerUnit::MilliWatt => "MW",
            PowerUnit::Watt => "W",
        }
    }

    /// Multiplier to watts.
    pub fn to_watts(self) -> f64 {
        match self {
            PowerUnit::PicoWatt => 1e-12,
            PowerUnit::NanoWatt => 1e-9,
            PowerUnit::MicroWatt => 1e-6,
            PowerUnit::MilliWatt => 1e-3,
            PowerUnit::Watt => 1.0,
        }
    }
}

/// Full-scale level of the linear display, 1 pW to 1 W.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    value: f64,
    unit: PowerUnit,
}

impl LinearScale {
    /// Validate `value` in `unit`.
    pub fn new(value: f64, unit: PowerUnit) -> Result<Self, OsaError> {
        let watts = value * unit.to_watts();
        // Relative tolerance so "1PW" and "1000MW" sit on the boundaries.
        if !value.is_finite() || !(1e-12 * (1.0 - 1e-9)..=1.0 + 1e-9).contains(&watts) {
            return Err(OsaError::invalid(
                "linear scale",
                format!("{value}{}", unit.as_token()),
                "must be between 1 pW and 1 W",
            ));
        }
        Ok(Self { value, unit })
    }

    /// Level in `unit()`s.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Unit prefix of the level.
    pub fn unit(&self) -> PowerUnit {
        self.unit
    }

    /// Level in watts.
    pub fn watts(&self) -> f64 {
        self.value * self.unit.to_watts()
    }
}

impl fmt::Display for LinearScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}{}", self.value, self.unit.as_token())
    }
}

impl FromStr for LinearScale {
    type Err = OsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_uppercase();
        let invalid = || OsaError::invalid("linear scale", s.trim(), "expected e.g. 1.00MW");
        // Longest suffix first: "W" is a suffix of every other unit.
        let unit = PowerUnit::ALL
            .iter()
            .copied()
            .filter(|u| text.ends_with(u.as_token()))
            .max_by_key(|u| u.as_token().len())
            .ok_or_else(invalid)?;
        let number = text[..text.len() - unit.as_token().len()].trim();
        let value: f64 = number.parse().map_err(|_| invalid())?;
        LinearScale::new(value, unit)
    }
}

// =============================================================================
// Continuous ranges
// =============================================================================

/// Bounds of a numeric setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    /// Name used in error messages.
    pub property: &'static str,
    /// Smallest accepted value.
    pub min: f64,
    /// Largest accepted value.
    pub max: f64,
}

impl Limits {
    /// Return `value` if it is finite and inside the bounds.
    pub fn check(&self, value: f64) -> Result<f64, OsaError> {
        if value.is_finite() && (self.min..=self.max).contains(&value) {
            Ok(value)
        } else {
            Err(OsaError::invalid(
                self.property,
                value,
                format!("must be between {} and {}", self.min, self.max),
            ))
        }
    }
}

/// Center wavelength window of the instrument.
pub const CENTER_WAVELENGTH_NM: Limits = Limits {
    property: "center wavelength",
    min: 600.0,
    max: 1750.0,
};

/// Start of the sweep window.
pub const START_WAVELENGTH_NM: Limits = Limits {
    property: "start wavelength",
    min: 600.0,
    max: 1750.0,
};

/// End of the sweep window.
pub const STOP_WAVELENGTH_NM: Limits = Limits {
    property: "stop wavelength",
    min: 600.0,
    max: 1750.0,
};

/// The span can cover at most the whole 600–1750 nm band.
pub const SPAN_NM: Limits = Limits {
    property: "span",
    min: 0.0,
    max: 1150.0,
};

/// Log scale, 0.1 to 10 dB/div.
pub const LOG_SCALE_DB_PER_DIV: Limits = Limits {
    property: "log scale",
    min: 0.1,
    max: 10.0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_sets_round_trip_their_tokens() {
        for v in TraceSelect::ALL {
            assert_eq!(v.as_token().parse::<TraceSelect>().unwrap(), *v);
        }
        for v in SamplingPoints::ALL {
            assert_eq!(v.to_string().parse::<SamplingPoints>().unwrap(), *v);
        }
        assert_eq!("A_B".parse::<TraceSelect>().unwrap(), TraceSelect::AMinusB);
        assert_eq!("freq\r\n".parse::<MarkerValue>().unwrap(), MarkerValue::Frequency);
    }

    #[test]
    fn closed_sets_reject_unknown_tokens() {
        let err = "C".parse::<Memory>().unwrap_err();
        match err {
            OsaError::InvalidValue { property, value, reason } => {
                assert_eq!(property, "memory");
                assert_eq!(value, "C");
                assert!(reason.contains("A, B"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!("4".parse::<Smoothing>().is_err());
        assert!("1000".parse::<SamplingPoints>().is_err());
        assert!("10KHZ".parse::<VideoBandwidth>().is_err());
    }

    #[test]
    fn resolution_from_numeric_reply() {
        assert_eq!(Resolution::from_nm(0.1).unwrap(), Resolution::Nm0_10);
        assert_eq!(Resolution::from_nm(1.0).unwrap(), Resolution::Nm1_00);
        assert!(Resolution::from_nm(0.3).is_err());
        assert_eq!(Resolution::Nm0_05.to_string(), "0.05");
    }

    #[test]
    fn sampling_points_count() {
        assert_eq!(SamplingPoints::P1001.count(), 1001);
        assert_eq!(SamplingPoints::ALL.len(), 7);
    }

    #[test]
    fn averaging_bounds() {
        assert_eq!("OFF".parse::<Averaging>().unwrap(), Averaging::Off);
        assert_eq!("2".parse::<Averaging>().unwrap(), Averaging::Count(2));
        assert_eq!("1000".parse::<Averaging>().unwrap(), Averaging::Count(1000));
        assert!("1".parse::<Averaging>().is_err());
        assert!("1001".parse::<Averaging>().is_err());
        assert!("many".parse::<Averaging>().is_err());
        assert_eq!(Averaging::Count(16).to_string(), "16");
        assert_eq!(Averaging::Off.to_string(), "OFF");
    }

    #[test]
    fn linear_scale_parsing_and_limits() {
        let scale: LinearScale = "1.00MW".parse().unwrap();
        assert_eq!(scale.unit(), PowerUnit::MilliWatt);
        assert_eq!(scale.value(), 1.0);
        assert_eq!(scale.to_string(), "1.00MW");

        let scale: LinearScale = " 2.5uW\r\n".parse().unwrap();
        assert_eq!(scale.unit(), PowerUnit::MicroWatt);
        assert!((scale.watts() - 2.5e-6).abs() < 1e-18);

        assert!("1PW".parse::<LinearScale>().is_ok());
        assert!("1W".parse::<LinearScale>().is_ok());
        assert!("0.5PW".parse::<LinearScale>().is_err());
        assert!("2W".parse::<LinearScale>().is_err());
        assert!("MW".parse::<LinearScale>().is_err());
        assert!("1.0".parse::<LinearScale>().is_err());
    }

    #[test]
    fn limits_reject_out_of_range_and_nan() {
        assert_eq!(CENTER_WAVELENGTH_NM.check(1550.0).unwrap(), 1550.0);
        assert!(CENTER_WAVELENGTH_NM.check(599.9).is_err());
        assert!(CENTER_WAVELENGTH_NM.check(f64::NAN).is_err());
        assert!(SPAN_NM.check(0.0).is_ok());
        assert!(SPAN_NM.check(1200.0).is_err());
        assert!(LOG_SCALE_DB_PER_DIV.check(0.1).is_ok());
        assert!(LOG_SCALE_DB_PER_DIV.check(10.5).is_err());
    }

    #[test]
    fn memory_suffix() {
        assert_eq!(Memory::A.suffix(), 'A');
        assert_eq!(Memory::B.suffix(), 'B');
    }
}
