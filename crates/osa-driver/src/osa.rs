//! Optical spectrum analyzer driver.
//!
//! Command table (query / command):
//! - `CNT?` `CNT` center, `SPN?` `SPN` span, `STA?` `STA` start, `STO?` `STO` stop (nm)
//! - `MKV` marker value, `LVS?` level scale, `LOG` log scale, `LLV` linear scale
//! - `ATT` attenuator, `RES` resolution, `VBW` video bandwidth
//! - `AVT` / `AVS` point / sweep average, `SMT` smoothing, `MPT` sampling points
//! - `PKS` / `DPS` peak / dip search, `MSL` memory, `TSL` trace select
//! - `DMD` display mode (max hold), `DRG` dynamic range, `MOD?` sweep status
//! - `DMx?` / `DQx?` ASCII memory dumps, `DCx?` range descriptor, `DBx?` binary dump
//! - `SSI` / `SRT` / `SST` sweep single / repeat / stop, `EMK` marker off, `*CLS`
//!
//! Every operation requires a connection; a disconnected driver reports
//! `OsaError::NotConnected` instead of silently skipping the command.
//!
//! # Usage
//!
//! ```rust,ignore
//! use osa_driver::{OsaConfig, OsaDriver};
//! use osa_core::settings::Memory;
//!
//! let driver = OsaDriver::connect_serial(&OsaConfig::new("/dev/ttyUSB0")).await?;
//! driver.set_center_wavelength(1550.0).await?;
//! driver.sweep_single().await?;
//! let trace = driver.read_trace(Memory::A).await?;
//! ```

use crate::config::OsaConfig;
use crate::serial::SerialTransport;
use osa_core::settings::{
    Averaging, DynamicRange, LinearScale, MarkerValue, Memory, Resolution, SamplingPoints,
    SearchMode, Smoothing, Switch, TraceSelect, VideoBandwidth, CENTER_WAVELENGTH_NM,
    LOG_SCALE_DB_PER_DIV, SPAN_NM, START_WAVELENGTH_NM, STOP_WAVELENGTH_NM,
};
use osa_core::{
    DecodeError, DecodedTrace, OsaError, OsaResult, OsaTransport, RangeDescriptor, ScaleMode,
    TraceDecoder,
};
use parking_lot::RwLock;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Largest sweep the analyzer can store (`MPT 5001`).
pub const MAX_SAMPLE_COUNT: usize = 5001;

/// Driver for an optical spectrum analyzer on a command/response link.
pub struct OsaDriver {
    link: RwLock<Option<Arc<dyn OsaTransport>>>,
    decoder: TraceDecoder,
}

impl OsaDriver {
    /// Disconnected driver that decodes traces with `decoder`.
    pub fn new(decoder: TraceDecoder) -> Self {
        Self {
            link: RwLock::new(None),
            decoder,
        }
    }

    /// Disconnected driver using the decoding policy of `config`.
    pub fn from_config(config: &OsaConfig) -> Self {
        Self::new(config.decoder())
    }

    /// Open the configured serial port and connect.
    pub async fn connect_serial(config: &OsaConfig) -> OsaResult<Self> {
        config.validate()?;
        let transport = SerialTransport::open(config).await?;
        let driver = Self::from_config(config);
        driver.connect(Arc::new(transport)).await?;
        Ok(driver)
    }

    /// Attach a transport and clear the instrument status.
    ///
    /// The driver only counts as connected once `*CLS` has been accepted.
    pub async fn connect(&self, transport: Arc<dyn OsaTransport>) -> OsaResult<()> {
        transport.write("*CLS").await?;
        tracing::info!(link = %transport.describe(), "Spectrum analyzer connected");
        *self.link.write() = Some(transport);
        Ok(())
    }

    /// Drop the transport. Later operations fail with `NotConnected`.
    pub fn disconnect(&self) {
        if self.link.write().take().is_some() {
            tracing::info!("Spectrum analyzer disconnected");
        }
    }

    /// Whether a transport is attached.
    pub fn is_connected(&self) -> bool {
        self.link.read().is_some()
    }

    /// Decoder used by `read_trace` and `level_scale`.
    pub fn decoder(&self) -> TraceDecoder {
        self.decoder
    }

    fn link(&self) -> OsaResult<Arc<dyn OsaTransport>> {
        self.link.read().clone().ok_or(OsaError::NotConnected)
    }

    async fn command(&self, command: &str) -> OsaResult<()> {
        self.link()?.write(command).await
    }

    async fn query(&self, command: &str) -> OsaResult<String> {
        self.link()?.query(command).await
    }

    async fn query_parsed<T>(&self, command: &str) -> OsaResult<T>
    where
        T: FromStr,
    {
        let reply = self.query(command).await?;
        reply
            .trim()
            .parse::<T>()
            .map_err(|_| OsaError::unexpected(command, reply.trim()))
    }

    async fn query_f64(&self, command: &str) -> OsaResult<f64> {
        self.query_parsed::<f64>(command).await
    }

    // =========================================================================
    // Wavelength
    // =========================================================================

    /// Center wavelength in nm.
    #[instrument(skip(self), err)]
    pub async fn center_wavelength(&self) -> OsaResult<f64> {
        self.query_f64("CNT?").await
    }

    /// Set the center wavelength (600 to 1750 nm).
    #[instrument(skip(self), err)]
    pub async fn set_center_wavelength(&self, nm: f64) -> OsaResult<()> {
        let nm = CENTER_WAVELENGTH_NM.check(nm)?;
        self.command(&format!("CNT {nm:7.2}")).await
    }

    /// Span in nm.
    #[instrument(skip(self), err)]
    pub async fn span(&self) -> OsaResult<f64> {
        self.query_f64("SPN?").await
    }

    /// Set the span (0 to 1150 nm).
    #[instrument(skip(self), err)]
    pub async fn set_span(&self, nm: f64) -> OsaResult<()> {
        let nm = SPAN_NM.check(nm)?;
        self.command(&format!("SPN {nm:7.1}")).await
    }

    /// Start wavelength in nm.
    #[instrument(skip(self), err)]
    pub async fn start_wavelength(&self) -> OsaResult<f64> {
        self.query_f64("STA?").await
    }

    /// Set the start wavelength.
    #[instrument(skip(self), err)]
    pub async fn set_start_wavelength(&self, nm: f64) -> OsaResult<()> {
        let nm = START_WAVELENGTH_NM.check(nm)?;
        self.command(&format!("STA {nm:7.1}")).await
    }

    /// Stop wavelength in nm.
    #[instrument(skip(self), err)]
    pub async fn stop_wavelength(&self) -> OsaResult<f64> {
        self.query_f64("STO?").await
    }

    /// Set the stop wavelength.
    #[instrument(skip(self), err)]
    pub async fn set_stop_wavelength(&self, nm: f64) -> OsaResult<()> {
        let nm = STOP_WAVELENGTH_NM.check(nm)?;
        self.command(&format!("STO {nm:7.1}")).await
    }

    /// Marker readout mode (`WAV` or `FRQ`).
    #[instrument(skip(self), err)]
    pub async fn marker_value(&self) -> OsaResult<MarkerValue> {
        self.query_parsed("MKV?").await
    }

    /// Select the marker readout.
    #[instrument(skip(self), err)]
    pub async fn set_marker_value(&self, value: MarkerValue) -> OsaResult<()> {
        self.command(&format!("MKV {value}")).await
    }

    // =========================================================================
    // Level
    // =========================================================================

    /// Current level scale, resolved with the driver's scale policy.
    #[instrument(skip(self), err)]
    pub async fn level_scale(&self) -> OsaResult<ScaleMode> {
        let reply = self.query("LVS?").await?;
        Ok(self.decoder.resolve_scale(&reply)?)
    }

    /// Log scale in dB/div.
    #[instrument(skip(self), err)]
    pub async fn log_scale(&self) -> OsaResult<f64> {
        self.query_f64("LOG?").await
    }

    /// Set the log scale in dB/div (0.1 to 10).
    #[instrument(skip(self), err)]
    pub async fn set_log_scale(&self, db_per_div: f64) -> OsaResult<()> {
        let db_per_div = LOG_SCALE_DB_PER_DIV.check(db_per_div)?;
        self.command(&format!("LOG {db_per_div:4.1}")).await
    }

    /// Linear scale reference level.
    #[instrument(skip(self), err)]
    pub async fn linear_scale(&self) -> OsaResult<LinearScale> {
        self.query_parsed("LLV?").await
    }

    /// Set the linear scale.
    #[instrument(skip(self), err)]
    pub async fn set_linear_scale(&self, scale: LinearScale) -> OsaResult<()> {
        self.command(&format!("LLV {scale}")).await
    }

    /// Optical attenuator on or off.
    #[instrument(skip(self), err)]
    pub async fn optical_attenuator(&self) -> OsaResult<Switch> {
        self.query_parsed("ATT?").await
    }

    /// Set the optical attenuator.
    #[instrument(skip(self), err)]
    pub async fn set_optical_attenuator(&self, state: Switch) -> OsaResult<()> {
        self.command(&format!("ATT {state}")).await
    }

    // =========================================================================
    // Resolution, bandwidth, averaging
    // =========================================================================

    /// Resolution bandwidth, mapped back onto the supported set.
    #[instrument(skip(self), err)]
    pub async fn resolution(&self) -> OsaResult<Resolution> {
        let nm = self.query_f64("RES?").await?;
        Resolution::from_nm(nm).map_err(|_| OsaError::unexpected("RES?", nm.to_string()))
    }

    /// Set the resolution.
    #[instrument(skip(self), err)]
    pub async fn set_resolution(&self, resolution: Resolution) -> OsaResult<()> {
        self.command(&format!("RES {resolution}")).await
    }

    /// Video bandwidth.
    #[instrument(skip(self), err)]
    pub async fn video_bandwidth(&self) -> OsaResult<VideoBandwidth> {
        self.query_parsed("VBW?").await
    }

    /// Set the video bandwidth.
    #[instrument(skip(self), err)]
    pub async fn set_video_bandwidth(&self, vbw: VideoBandwidth) -> OsaResult<()> {
        self.command(&format!("VBW {vbw}")).await
    }

    /// Averaging per point (`AVT`).
    #[instrument(skip(self), err)]
    pub async fn point_average(&self) -> OsaResult<Averaging> {
        self.query_parsed("AVT?").await
    }

    /// Count outside 2..=1000 is rejected before anything is sent.
    #[instrument(skip(self), err)]
    pub async fn set_point_average(&self, averaging: Averaging) -> OsaResult<()> {
        let averaging = revalidate(averaging)?;
        self.command(&format!("AVT {averaging}")).await
    }

    /// Averaging over sweeps (`AVS`).
    #[instrument(skip(self), err)]
    pub async fn sweep_average(&self) -> OsaResult<Averaging> {
        self.query_parsed("AVS?").await
    }

    /// Same limits as `set_point_average`.
    #[instrument(skip(self), err)]
    pub async fn set_sweep_average(&self, averaging: Averaging) -> OsaResult<()> {
        let averaging = revalidate(averaging)?;
        self.command(&format!("AVS {averaging}")).await
    }

    /// Smoothing on or off.
    #[instrument(skip(self), err)]
    pub async fn smoothing(&self) -> OsaResult<Smoothing> {
        self.query_parsed("SMT?").await
    }

    /// Set the smoothing.
    #[instrument(skip(self), err)]
    pub async fn set_smoothing(&self, smoothing: Smoothing) -> OsaResult<()> {
        self.command(&format!("SMT {smoothing}")).await
    }

    /// Points per sweep.
    #[instrument(skip(self), err)]
    pub async fn sampling_points(&self) -> OsaResult<SamplingPoints> {
        self.query_parsed("MPT?").await
    }

    /// Set the sampling points.
    #[instrument(skip(self), err)]
    pub async fn set_sampling_points(&self, points: SamplingPoints) -> OsaResult<()> {
        self.command(&format!("MPT {points}")).await
    }

    // =========================================================================
    // Search, memories, display
    // =========================================================================

    /// Peak search mode.
    #[instrument(skip(self), err)]
    pub async fn peak_search(&self) -> OsaResult<SearchMode> {
        self.query_parsed("PKS?").await
    }

    /// Set the peak search.
    #[instrument(skip(self), err)]
    pub async fn set_peak_search(&self, mode: SearchMode) -> OsaResult<()> {
        self.command(&format!("PKS {mode}")).await
    }

    /// Dip search mode.
    #[instrument(skip(self), err)]
    pub async fn dip_search(&self) -> OsaResult<SearchMode> {
        self.query_parsed("DPS?").await
    }

    /// Set the dip search.
    #[instrument(skip(self), err)]
    pub async fn set_dip_search(&self, mode: SearchMode) -> OsaResult<()> {
        self.command(&format!("DPS {mode}")).await
    }

    /// Memory shown on screen.
    #[instrument(skip(self), err)]
    pub async fn memory_select(&self) -> OsaResult<Memory> {
        self.query_parsed("MSL?").await
    }

    /// Set the memory select.
    #[instrument(skip(self), err)]
    pub async fn set_memory_select(&self, memory: Memory) -> OsaResult<()> {
        self.command(&format!("MSL {memory}")).await
    }

    /// Trace memory the display writes into.
    #[instrument(skip(self), err)]
    pub async fn trace_select(&self) -> OsaResult<TraceSelect> {
        self.query_parsed("TSL?").await
    }

    /// Set the trace select.
    #[instrument(skip(self), err)]
    pub async fn set_trace_select(&self, trace: TraceSelect) -> OsaResult<()> {
        self.command(&format!("TSL {trace}")).await
    }

    /// Max hold display mode (`DMD MHL` on, `DMD NRM` off).
    #[instrument(skip(self), err)]
    pub async fn max_hold(&self) -> OsaResult<Switch> {
        let reply = self.query("DMD?").await?;
        match reply.trim() {
            "MHL" => Ok(Switch::On),
            "NRM" => Ok(Switch::Off),
            other => Err(OsaError::unexpected("DMD?", other)),
        }
    }

    /// Set the max hold.
    #[instrument(skip(self), err)]
    pub async fn set_max_hold(&self, state: Switch) -> OsaResult<()> {
        let mode = match state {
            Switch::On => "MHL",
            Switch::Off => "NRM",
        };
        self.command(&format!("DMD {mode}")).await
    }

    /// Dynamic range mode.
    #[instrument(skip(self), err)]
    pub async fn dynamic_range(&self) -> OsaResult<DynamicRange> {
        self.query_parsed("DRG?").await
    }

    /// Set the dynamic range.
    #[instrument(skip(self), err)]
    pub async fn set_dynamic_range(&self, range: DynamicRange) -> OsaResult<()> {
        self.command(&format!("DRG {range}")).await
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Clear the status registers (`*CLS`).
    pub async fn clear_status(&self) -> OsaResult<()> {
        self.command("*CLS").await
    }

    /// Erase the marker.
    pub async fn marker_off(&self) -> OsaResult<()> {
        self.command("EMK").await
    }

    /// Start one sweep.
    pub async fn sweep_single(&self) -> OsaResult<()> {
        self.command("SSI").await
    }

    /// Sweep continuously.
    pub async fn sweep_repeat(&self) -> OsaResult<()> {
        self.command("SRT").await
    }

    /// Stop sweeping.
    pub async fn sweep_stop(&self) -> OsaResult<()> {
        self.command("SST").await
    }

    /// Hand the front panel back to the operator.
    pub async fn user_mode(&self) -> OsaResult<()> {
        self.link()?.go_to_local().await
    }

    /// Raw `MOD?` status; non-zero while a sweep is running.
    #[instrument(skip(self), err)]
    pub async fn measuring_status(&self) -> OsaResult<i32> {
        self.query_parsed("MOD?").await
    }

    /// Poll `MOD?` until the sweep finishes.
    pub async fn wait_for_sweep(&self, poll: Duration, limit: Duration) -> OsaResult<()> {
        let started = tokio::time::Instant::now();
        loop {
            let status = self.measuring_status().await?;
            if status == 0 {
                tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Sweep finished");
                return Ok(());
            }
            if started.elapsed() >= limit {
                return Err(OsaError::Timeout {
                    command: "MOD?".to_string(),
                    timeout: limit,
                });
            }
            tokio::time::sleep(poll).await;
        }
    }

    // =========================================================================
    // Trace memory
    // =========================================================================

    /// ASCII level dump of a memory (`DMA?` / `DMB?`), unparsed.
    #[instrument(skip(self), err)]
    pub async fn memory_data_dm(&self, memory: Memory) -> OsaResult<String> {
        self.query(&format!("DM{}?", memory.suffix())).await
    }

    /// ASCII dump of a memory in the `DQA?` / `DQB?` format, unparsed.
    #[instrument(skip(self), err)]
    pub async fn memory_data_dq(&self, memory: Memory) -> OsaResult<String> {
        self.query(&format!("DQ{}?", memory.suffix())).await
    }

    /// Wavelength axis of a memory (`DCA?` / `DCB?`).
    #[instrument(skip(self), err)]
    pub async fn memory_range(&self, memory: Memory) -> OsaResult<RangeDescriptor> {
        let reply = self.query(&format!("DC{}?", memory.suffix())).await?;
        Ok(reply.parse::<RangeDescriptor>()?)
    }

    /// Read and decode the binary dump of a memory.
    ///
    /// Queries the level scale and range first so the dump can be read by
    /// length; a short or long dump fails with `TruncatedPayload`. A range
    /// with more samples than the instrument can sweep is rejected before the
    /// dump is requested.
    #[instrument(skip(self), err)]
    pub async fn read_trace(&self, memory: Memory) -> OsaResult<DecodedTrace> {
        let link = self.link()?;

        let scale_token = link.query("LVS?").await?;
        let mode = self.decoder.resolve_scale(&scale_token)?;
        let range_token = link.query(&format!("DC{}?", memory.suffix())).await?;
        let range: RangeDescriptor = range_token.parse()?;
        if range.sample_count > MAX_SAMPLE_COUNT {
            return Err(DecodeError::MalformedRange {
                descriptor: range_token.trim().to_string(),
                reason: format!("sample count exceeds the instrument maximum of {MAX_SAMPLE_COUNT}"),
            }
            .into());
        }
        let expected_len = range.payload_len(mode)?;

        link.write(&format!("DB{}?", memory.suffix())).await?;
        let raw = link.read_raw(expected_len).await?;

        let trace = self.decoder.decode_with(&raw, mode, &range)?;
        tracing::info!(
            memory = %memory,
            %mode,
            samples = trace.len(),
            "Read binary trace"
        );
        Ok(trace)
    }
}

impl Default for OsaDriver {
    fn default() -> Self {
        Self::new(TraceDecoder::default())
    }
}

/// `Averaging::Count` is constructible directly; re-check its bounds.
fn revalidate(averaging: Averaging) -> OsaResult<Averaging> {
    match averaging {
        Averaging::Off => Ok(Averaging::Off),
        Averaging::Count(n) => Averaging::count(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    async fn connected(mock: MockTransport) -> (OsaDriver, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let driver = OsaDriver::default();
        driver.connect(mock.clone()).await.unwrap();
        mock.clear_call_log();
        (driver, mock)
    }

    #[tokio::test]
    async fn connect_clears_status() {
        let mock = Arc::new(MockTransport::new());
        let driver = OsaDriver::default();
        assert!(!driver.is_connected());

        driver.connect(mock.clone()).await.unwrap();
        assert!(driver.is_connected());
        assert_eq!(mock.call_log(), vec!["*CLS"]);
    }

    #[tokio::test]
    async fn failed_connect_leaves_driver_disconnected() {
        let mock = Arc::new(MockTransport::new());
        mock.trigger_failure();
        let driver = OsaDriver::default();

        assert!(driver.connect(mock).await.is_err());
        assert!(!driver.is_connected());
    }

    #[tokio::test]
    async fn disconnected_driver_fails_loudly() {
        let driver = OsaDriver::default();
        assert!(matches!(driver.center_wavelength().await, Err(OsaError::NotConnected)));
        assert!(matches!(driver.sweep_single().await, Err(OsaError::NotConnected)));
        assert!(matches!(driver.read_trace(Memory::A).await, Err(OsaError::NotConnected)));
    }

    #[tokio::test]
    async fn wavelength_commands_use_fixed_width_formatting() {
        let (driver, mock) = connected(MockTransport::new()).await;

        driver.set_center_wavelength(1550.0).await.unwrap();
        driver.set_span(20.0).await.unwrap();
        driver.set_start_wavelength(1540.0).await.unwrap();
        driver.set_stop_wavelength(1560.0).await.unwrap();
        driver.set_log_scale(0.5).await.unwrap();

        assert_eq!(
            mock.call_log(),
            vec!["CNT 1550.00", "SPN    20.0", "STA  1540.0", "STO  1560.0", "LOG  0.5"]
        );
    }

    #[tokio::test]
    async fn out_of_range_values_are_not_sent() {
        let (driver, mock) = connected(MockTransport::new()).await;

        assert!(driver.set_center_wavelength(1800.0).await.is_err());
        assert!(driver.set_log_scale(0.0).await.is_err());
        assert!(driver.set_point_average(Averaging::Count(1)).await.is_err());
        assert!(mock.call_log().is_empty());
    }

    #[tokio::test]
    async fn max_hold_maps_display_modes() {
        let (driver, mock) = connected(MockTransport::new()).await;

        driver.set_max_hold(Switch::On).await.unwrap();
        assert_eq!(driver.max_hold().await.unwrap(), Switch::On);
        driver.set_max_hold(Switch::Off).await.unwrap();
        assert_eq!(driver.max_hold().await.unwrap(), Switch::Off);

        mock.set_response("DMD?", "XYZ");
        assert!(matches!(
            driver.max_hold().await,
            Err(OsaError::UnexpectedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn unparsable_reply_is_reported() {
        let (driver, _mock) = connected(MockTransport::new().with_response("CNT?", "ERR")).await;
        match driver.center_wavelength().await {
            Err(OsaError::UnexpectedResponse { command, response }) => {
                assert_eq!(command, "CNT?");
                assert_eq!(response, "ERR");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_trace_queries_scale_range_then_dump() {
        let mock = MockTransport::new()
            .with_response("LVS?", "LOG")
            .with_response("DCB?", "1500.00,1600.00,3")
            .with_block(vec![0xE9, 0xA2, 0x00, 0x00, 0x00, 0x64]);
        let (driver, mock) = connected(mock).await;

        let trace = driver.read_trace(Memory::B).await.unwrap();
        assert_eq!(trace.wavelengths, vec![1500.0, 1550.0, 1600.0]);
        assert_eq!(trace.powers, vec![-57.26, 0.0, 1.0]);
        assert_eq!(
            mock.call_log(),
            vec!["LVS?", "DCB?", "DBB?", "<read 6 bytes>"]
        );
    }

    #[tokio::test]
    async fn actions_and_memory_queries_use_their_mnemonics() {
        let mock = MockTransport::new()
            .with_response("DMA?", "-60.00,-59.50")
            .with_response("DQB?", "1550.00,-3.20")
            .with_response("DCA?", "1500.0,1600.0,1001.0");
        let (driver, mock) = connected(mock).await;

        driver.clear_status().await.unwrap();
        driver.marker_off().await.unwrap();
        driver.sweep_repeat().await.unwrap();
        driver.sweep_stop().await.unwrap();
        assert_eq!(driver.memory_data_dm(Memory::A).await.unwrap(), "-60.00,-59.50");
        assert_eq!(driver.memory_data_dq(Memory::B).await.unwrap(), "1550.00,-3.20");
        assert_eq!(driver.memory_range(Memory::A).await.unwrap().sample_count, 1001);

        assert_eq!(
            mock.call_log(),
            vec!["*CLS", "EMK", "SRT", "SST", "DMA?", "DQB?", "DCA?"]
        );
        assert!(matches!(driver.user_mode().await, Err(OsaError::Unsupported(_))));
    }

    #[tokio::test]
    async fn oversized_range_is_rejected_before_the_dump() {
        for range in ["1500,1600,1e12", "1500,1600,5002", "1500,1600,9223372036854775808"] {
            let mock = MockTransport::new()
                .with_response("LVS?", "LIN")
                .with_response("DCA?", range);
            let (driver, mock) = connected(mock).await;

            let err = driver.read_trace(Memory::A).await.unwrap_err();
            assert!(
                matches!(err, OsaError::Decode(DecodeError::MalformedRange { .. })),
                "{range}: {err:?}"
            );
            assert_eq!(mock.call_log(), vec!["LVS?", "DCA?"], "{range}");
        }
    }

    #[tokio::test]
    async fn largest_sweep_is_read() {
        let mock = MockTransport::new()
            .with_response("LVS?", "LOG")
            .with_response("DCA?", "1500,1600,5001")
            .with_block(vec![0; 2 * MAX_SAMPLE_COUNT]);
        let (driver, mock) = connected(mock).await;

        let trace = driver.read_trace(Memory::A).await.unwrap();
        assert_eq!(trace.len(), MAX_SAMPLE_COUNT);
        assert_eq!(SamplingPoints::P5001.count(), MAX_SAMPLE_COUNT);
        assert!(mock.call_log().contains(&"<read 10002 bytes>".to_string()));
    }

    #[tokio::test]
    async fn wait_for_sweep_polls_until_idle() {
        let (driver, mock) = connected(MockTransport::new().with_response("MOD?", "0")).await;
        driver
            .wait_for_sweep(Duration::from_millis(1), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(mock.call_log(), vec!["MOD?"]);

        mock.set_response("MOD?", "1");
        let err = driver
            .wait_for_sweep(Duration::from_millis(1), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, OsaError::Timeout { .. }));
    }
}
