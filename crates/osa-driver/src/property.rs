//! Name-based access to the analyzer settings.
//!
//! The CLI and config layers address settings by kebab-case name
//! (`center-wavelength`, `video-bandwidth`); this module maps those names onto
//! the typed getters and setters of [`OsaDriver`].

use crate::osa::OsaDriver;
use osa_core::settings::LinearScale;
use osa_core::{OsaError, OsaResult};
use std::fmt;
use std::str::FromStr;

/// An addressable analyzer setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// `CNT`
    CenterWavelength,
    /// `SPN`
    Span,
    /// `STA`
    StartWavelength,
    /// `STO`
    StopWavelength,
    /// `MKV`
    MarkerValue,
    /// `LVS`, read only.
    LevelScale,
    /// `LOG`
    LogScale,
    /// `LLV`
    LinearScale,
    /// `ATT`
    Attenuator,
    /// `RES`
    Resolution,
    /// `VBW`
    VideoBandwidth,
    /// `AVT`
    PointAverage,
    /// `AVS`
    SweepAverage,
    /// `SMT`
    Smoothing,
    /// `MPT`
    SamplingPoints,
    /// `PKS`
    PeakSearch,
    /// `DPS`
    DipSearch,
    /// `MSL`
    Memory,
    /// `TSL`
    TraceSelect,
    /// `DMD`, as on/off.
    MaxHold,
    /// `DRG`
    DynamicRange,
    /// `MOD`, read only.
    MeasuringStatus,
}

impl Property {
    /// Every setting, in `get all` order.
    pub const ALL: &'static [Property] = &[
        Property::CenterWavelength,
        Property::Span,
        Property::StartWavelength,
        Property::StopWavelength,
        Property::MarkerValue,
        Property::LevelScale,
        Property::LogScale,
        Property::LinearScale,
        Property::Attenuator,
        Property::Resolution,
        Property::VideoBandwidth,
        Property::PointAverage,
        Property::SweepAverage,
        Property::Smoothing,
        Property::SamplingPoints,
        Property::PeakSearch,
        Property::DipSearch,
        Property::Memory,
        Property::TraceSelect,
        Property::MaxHold,
        Property::DynamicRange,
        Property::MeasuringStatus,
    ];

    /// Kebab-case name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Property::CenterWavelength => "center-wavelength",
            Property::Span => "span",
            Property::StartWavelength => "start-wavelength",
            Property::StopWavelength => "stop-wavelength",
            Property::MarkerValue => "marker-value",
            Property::LevelScale => "level-scale",
            Property::LogScale => "log-scale",
            Property::LinearScale => "linear-scale",
            Property::Attenuator => "attenuator",
            Property::Resolution => "resolution",
            Property::VideoBandwidth => "video-bandwidth",
            Property::PointAverage => "point-average",
            Property::SweepAverage => "sweep-average",
            Property::Smoothing => "smoothing",
            Property::SamplingPoints => "sampling-points",
            Property::PeakSearch => "peak-search",
            Property::DipSearch => "dip-search",
            Property::Memory => "memory",
            Property::TraceSelect => "trace-select",
            Property::MaxHold => "max-hold",
            Property::DynamicRange => "dynamic-range",
            Property::MeasuringStatus => "measuring-status",
        }
    }

    /// Instrument mnemonic behind the setting.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Property::CenterWavelength => "CNT",
            Property::Span => "SPN",
            Property::StartWavelength => "STA",
            Property::StopWavelength => "STO",
            Property::MarkerValue => "MKV",
            Property::LevelScale => "LVS",
            Property::LogScale => "LOG",
            Property::LinearScale => "LLV",
            Property::Attenuator => "ATT",
            Property::Resolution => "RES",
            Property::VideoBandwidth => "VBW",
            Property::PointAverage => "AVT",
            Property::SweepAverage => "AVS",
            Property::Smoothing => "SMT",
            Property::SamplingPoints => "MPT",
            Property::PeakSearch => "PKS",
            Property::DipSearch => "DPS",
            Property::Memory => "MSL",
            Property::TraceSelect => "TSL",
            Property::MaxHold => "DMD",
            Property::DynamicRange => "DRG",
            Property::MeasuringStatus => "MOD",
        }
    }

    /// Whether `set_property` accepts this setting.
    pub fn is_writable(self) -> bool {
        !matches!(self, Property::LevelScale | Property::MeasuringStatus)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = OsaError;

    /// Accepts the kebab-case name, with `_` in place of `-`, or the mnemonic.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Property::ALL
            .iter()
            .copied()
            .find(|p| p.name() == wanted || p.mnemonic().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| OsaError::invalid("property", s, "unknown property"))
    }
}

fn parse_number(property: Property, value: &str) -> OsaResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| OsaError::invalid(property.name(), value, "expected a number"))
}

impl OsaDriver {
    /// Read a setting and render it the way the instrument spells it.
    pub async fn get_property(&self, property: Property) -> OsaResult<String> {
        let value = match property {
            Property::CenterWavelength => format!("{:.2}", self.center_wavelength().await?),
            Property::Span => format!("{:.1}", self.span().await?),
            Property::StartWavelength => format!("{:.1}", self.start_wavelength().await?),
            Property::StopWavelength => format!("{:.1}", self.stop_wavelength().await?),
            Property::MarkerValue => self.marker_value().await?.to_string(),
            Property::LevelScale => self.level_scale().await?.to_string(),
            Property::LogScale => format!("{:.1}", self.log_scale().await?),
            Property::LinearScale => self.linear_scale().await?.to_string(),
            Property::Attenuator => self.optical_attenuator().await?.to_string(),
            Property::Resolution => self.resolution().await?.to_string(),
            Property::VideoBandwidth => self.video_bandwidth().await?.to_string(),
            Property::PointAverage => self.point_average().await?.to_string(),
            Property::SweepAverage => self.sweep_average().await?.to_string(),
            Property::Smoothing => self.smoothing().await?.to_string(),
            Property::SamplingPoints => self.sampling_points().await?.to_string(),
            Property::PeakSearch => self.peak_search().await?.to_string(),
            Property::DipSearch => self.dip_search().await?.to_string(),
            Property::Memory => self.memory_select().await?.to_string(),
            Property::TraceSelect => self.trace_select().await?.to_string(),
            Property::MaxHold => self.max_hold().await?.to_string(),
            Property::DynamicRange => self.dynamic_range().await?.to_string(),
            Property::MeasuringStatus => self.measuring_status().await?.to_string(),
        };
        Ok(value)
    }

    /// Parse `value` for `property` and send it.
    ///
    /// Values are validated before anything reaches the link.
    pub async fn set_property(&self, property: Property, value: &str) -> OsaResult<()> {
        match property {
            Property::CenterWavelength => {
                self.set_center_wavelength(parse_number(property, value)?).await
            }
            Property::Span => self.set_span(parse_number(property, value)?).await,
            Property::StartWavelength => {
                self.set_start_wavelength(parse_number(property, value)?).await
            }
            Property::StopWavelength => {
                self.set_stop_wavelength(parse_number(property, value)?).await
            }
            Property::MarkerValue => self.set_marker_value(value.parse()?).await,
            Property::LogScale => self.set_log_scale(parse_number(property, value)?).await,
            Property::LinearScale => {
                self.set_linear_scale(value.parse::<LinearScale>()?).await
            }
            Property::Attenuator => self.set_optical_attenuator(value.parse()?).await,
            Property::Resolution => self.set_resolution(value.parse()?).await,
            Property::VideoBandwidth => self.set_video_bandwidth(value.parse()?).await,
            Property::PointAverage => self.set_point_average(value.parse()?).await,
            Property::SweepAverage => self.set_sweep_average(value.parse()?).await,
            Property::Smoothing => self.set_smoothing(value.parse()?).await,
            Property::SamplingPoints => self.set_sampling_points(value.parse()?).await,
            Property::PeakSearch => self.set_peak_search(value.parse()?).await,
            Property::DipSearch => self.set_dip_search(value.parse()?).await,
            Property::Memory => self.set_memory_select(value.parse()?).await,
            Property::TraceSelect => self.set_trace_select(value.parse()?).await,
            Property::MaxHold => self.set_max_hold(value.parse()?).await,
            Property::DynamicRange => self.set_dynamic_range(value.parse()?).await,
            Property::LevelScale | Property::MeasuringStatus => Err(OsaError::invalid(
                property.name(),
                value,
                "property is read-only",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn names_and_mnemonics_are_unique() {
        let names: HashSet<_> = Property::ALL.iter().map(|p| p.name()).collect();
        let mnemonics: HashSet<_> = Property::ALL.iter().map(|p| p.mnemonic()).collect();
        assert_eq!(names.len(), Property::ALL.len());
        assert_eq!(mnemonics.len(), Property::ALL.len());
    }

    #[test]
    fn parses_names_and_mnemonics() {
        assert_eq!(
            "center-wavelength".parse::<Property>().unwrap(),
            Property::CenterWavelength
        );
        assert_eq!("VIDEO_BANDWIDTH".parse::<Property>().unwrap(), Property::VideoBandwidth);
        assert_eq!("vbw".parse::<Property>().unwrap(), Property::VideoBandwidth);
        assert!("brightness".parse::<Property>().is_err());
    }

    #[tokio::test]
    async fn set_then_get_round_trips_through_the_link() {
        let mock = Arc::new(MockTransport::new());
        let driver = OsaDriver::default();
        driver.connect(mock.clone()).await.unwrap();

        driver
            .set_property(Property::CenterWavelength, "1310")
            .await
            .unwrap();
        driver
            .set_property(Property::VideoBandwidth, "1khz")
            .await
            .unwrap();
        driver.set_property(Property::MaxHold, "on").await.unwrap();

        assert_eq!(
            driver.get_property(Property::CenterWavelength).await.unwrap(),
            "1310.00"
        );
        assert_eq!(
            driver.get_property(Property::VideoBandwidth).await.unwrap(),
            "1KHZ"
        );
        assert_eq!(driver.get_property(Property::MaxHold).await.unwrap(), "ON");
    }

    #[tokio::test]
    async fn invalid_values_never_reach_the_link() {
        let mock = Arc::new(MockTransport::new());
        let driver = OsaDriver::default();
        driver.connect(mock.clone()).await.unwrap();
        mock.clear_call_log();

        assert!(driver.set_property(Property::Span, "wide").await.is_err());
        assert!(driver.set_property(Property::Smoothing, "4").await.is_err());
        assert!(driver
            .set_property(Property::MeasuringStatus, "0")
            .await
            .is_err());
        assert!(mock.call_log().is_empty());
    }
}
