//! End-to-end driver tests over the in-memory serial link.

use osa_core::settings::{Memory, Resolution, VideoBandwidth};
use osa_core::{DecodeError, OsaError, OsaTransport, ScaleMode, TraceDecoder};
use osa_driver::mock::MockTransport;
use osa_driver::mock_serial::{self, DeviceHarness};
use osa_driver::{OsaDriver, Property, SerialTransport};
use std::sync::Arc;
use std::time::Duration;

async fn serial_driver(decoder: TraceDecoder) -> (Arc<OsaDriver>, DeviceHarness) {
    let (port, mut device) = mock_serial::pair();
    let transport: Arc<dyn OsaTransport> = Arc::new(
        SerialTransport::from_port(port, "mock")
            .with_timeout(Duration::from_millis(500))
            .with_idle_timeout(Duration::from_millis(100))
            .with_retries(1),
    );

    let driver = Arc::new(OsaDriver::new(decoder));
    let connecting = tokio::spawn({
        let driver = driver.clone();
        async move { driver.connect(transport).await }
    });
    device.expect_command("*CLS").await;
    connecting.await.unwrap().unwrap();

    (driver, device)
}

#[tokio::test]
async fn reads_linear_trace_over_serial() {
    let (driver, mut device) = serial_driver(TraceDecoder::default()).await;

    let reading = tokio::spawn({
        let driver = driver.clone();
        async move { driver.read_trace(Memory::A).await }
    });

    device.expect_command("LVS?").await;
    device.reply("LIN").await;
    device.expect_command("DCA?").await;
    device.reply("1550.00,1551.00,2").await;
    device.expect_command("DBA?").await;
    device
        .send_bytes(&[0xFF, 0xF7, 0x27, 0x10, 0xFF, 0xF7, 0x27, 0x10])
        .await;
    device.send_bytes(b"\r\n").await;

    let trace = reading.await.unwrap().unwrap();
    assert_eq!(trace.mode, ScaleMode::Linear);
    assert_eq!(trace.wavelengths, vec![1550.0, 1551.0]);
    assert_eq!(trace.powers, vec![1e-9, 1e-9]);

    // The link is clean after the block.
    let sweeping = tokio::spawn({
        let driver = driver.clone();
        async move { driver.sweep_single().await }
    });
    device.expect_command("SSI").await;
    sweeping.await.unwrap().unwrap();
}

#[tokio::test]
async fn short_dump_is_reported_as_truncated() {
    let (driver, mut device) = serial_driver(TraceDecoder::default()).await;

    let reading = tokio::spawn({
        let driver = driver.clone();
        async move { driver.read_trace(Memory::B).await }
    });

    device.expect_command("LVS?").await;
    device.reply("LOG").await;
    device.expect_command("DCB?").await;
    device.reply("1500.0,1600.0,3").await;
    device.expect_command("DBB?").await;
    device.send_bytes(&[0xE9, 0xA2, 0x00]).await;

    match reading.await.unwrap() {
        Err(OsaError::Decode(DecodeError::TruncatedPayload {
            expected, actual, ..
        })) => {
            assert_eq!(expected, 6);
            assert_eq!(actual, 3);
        }
        other => panic!("expected a truncated payload, got {other:?}"),
    }
}

#[tokio::test]
async fn strict_decoder_rejects_unknown_scale_before_reading_the_dump() {
    let (driver, mut device) = serial_driver(TraceDecoder::strict()).await;

    let reading = tokio::spawn({
        let driver = driver.clone();
        async move { driver.read_trace(Memory::A).await }
    });

    device.expect_command("LVS?").await;
    device.reply("DBM").await;

    let err = reading.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        OsaError::Decode(DecodeError::UnsupportedScaleMode(_))
    ));
}

#[tokio::test]
async fn settings_are_framed_on_the_wire() {
    let (driver, mut device) = serial_driver(TraceDecoder::default()).await;

    let setting = tokio::spawn({
        let driver = driver.clone();
        async move {
            driver.set_center_wavelength(1310.5).await?;
            driver.set_resolution(Resolution::Nm0_10).await?;
            driver.set_property(Property::VideoBandwidth, "100hz").await?;
            driver.resolution().await
        }
    });

    device.expect_command("CNT 1310.50").await;
    device.expect_command("RES 0.10").await;
    device.expect_command("VBW 100HZ").await;
    device.expect_command("RES?").await;
    device.reply("0.1").await;

    assert_eq!(setting.await.unwrap().unwrap(), Resolution::Nm0_10);
}

#[tokio::test]
async fn full_session_against_scripted_instrument() {
    let mock = Arc::new(
        MockTransport::new()
            .with_response("LVS?", "LOG")
            .with_response("DCA?", "1500.00,1502.00,3")
            .with_response("MOD?", "0")
            .with_block(vec![0xE9, 0xA2, 0xFF, 0x9C, 0x00, 0x00])
            .with_local_support(),
    );
    let driver = OsaDriver::default();
    driver.connect(mock.clone()).await.unwrap();

    driver.set_video_bandwidth(VideoBandwidth::KHz1).await.unwrap();
    driver.sweep_single().await.unwrap();
    driver
        .wait_for_sweep(Duration::from_millis(1), Duration::from_secs(1))
        .await
        .unwrap();

    let trace = driver.read_trace(Memory::A).await.unwrap();
    assert_eq!(trace.powers, vec![-57.26, -1.0, 0.0]);
    assert_eq!(trace.wavelengths, vec![1500.0, 1501.0, 1502.0]);
    assert_eq!(trace.peak(), Some((1502.0, 0.0)));

    driver.user_mode().await.unwrap();
    driver.disconnect();
    assert!(matches!(
        driver.sweep_stop().await,
        Err(OsaError::NotConnected)
    ));

    assert_eq!(
        mock.call_log(),
        vec![
            "*CLS",
            "VBW 1KHZ",
            "SSI",
            "MOD?",
            "LVS?",
            "DCA?",
            "DBA?",
            "<read 6 bytes>",
            "<go to local>",
        ]
    );
}
