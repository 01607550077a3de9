//! Integration tests for the streaming guarantees
//!
//! Each test drives a `StreamEngine` over the simulated transceiver and
//! checks one externally visible property of the engine.

mod helpers;

use std::time::Duration;

use bladerf_stream::{HostSample, StreamArgs, StreamError, StreamFlags, TimeConverter};
use brf_sync::{Direction, MetaFlags, MetaStatus, SampleFormat};
use num_complex::Complex;

const TIMEOUT: Duration = Duration::from_millis(100);

#[test]
fn test_tick_time_round_trip() {
    let conv = TimeConverter::new(10e6);
    assert_eq!(conv.ticks_to_ns(10_000_000), 1_000_000_000);
    assert_eq!(conv.ns_to_ticks(1_000_000_000), 10_000_000);

    let conv = TimeConverter::new(61.44e6 / 3.0);
    let mut ticks = 1u64;
    while ticks < 1 << 40 {
        assert_eq!(conv.ns_to_ticks(conv.ticks_to_ns(ticks)), ticks);
        ticks = ticks * 7 + 3;
    }
}

#[test]
fn test_buflen_rounded_to_1024() {
    for (buflen, expected) in [(4097, 5120), (1024, 1024), (1, 1024), (3072, 3072)] {
        let (engine, handle) =
            helpers::engine_with_stream(Direction::Rx, "CF32", &[0], &format!("buflen={}", buflen));
        assert_eq!(engine.mtu(&handle), expected);
        let config = engine.hardware().config(Direction::Rx).unwrap();
        assert_eq!(config.buffer_size as usize, expected);
    }
}

#[test]
fn test_transfer_count_clamped() {
    for (args, buffers, transfers) in [
        ("buffers=1", 2, 1),
        ("buffers=8, transfers=100", 8, 8),
        ("buffers=128", 128, 32),
        ("buffers=128, transfers=40", 128, 32),
        ("buffers=6, transfers=3", 6, 3),
    ] {
        let params = args.parse::<StreamArgs>().unwrap().resolve().unwrap();
        assert_eq!(params.num_buffers, buffers, "{}", args);
        assert_eq!(params.num_transfers, transfers, "{}", args);
        assert!(params.num_transfers >= 1);
    }
}

#[test]
fn test_cf32_round_trip_within_one_lsb() {
    let fmt = SampleFormat::Sc16Q11Meta;
    let mut v = -1.0f32;
    while v < 1.0 {
        let (i, q) = Complex::new(v, -v).to_wire(fmt);
        let back = Complex::<f32>::from_wire(i, q, fmt);
        assert!((v - back.re).abs() <= 1.0 / 2048.0, "{} -> {}", v, back.re);
        assert!((-v - back.im).abs() <= 1.0 / 2048.0, "{} -> {}", -v, back.im);
        v += 0.000_37;
    }
}

#[test]
fn test_overflow_reported_once_on_following_call() {
    let (mut engine, rx) = helpers::engine_with_stream(Direction::Rx, "CF32", &[0], "buflen=1024");
    engine.hardware_mut().set_time(Direction::Rx, 3000);
    engine
        .activate_stream(&rx, StreamFlags::empty(), 0, 0)
        .unwrap();
    engine
        .hardware_mut()
        .push_status(Direction::Rx, MetaStatus::OVERRUN);

    let mut buf = vec![Complex::<f32>::default(); 1024];
    let info = engine.read_stream(&rx, &mut [&mut buf], TIMEOUT).unwrap();
    assert_eq!(info.samples, 1024);
    assert_eq!(info.time_ns, 3_000_000);

    let calls = engine.hardware().rx_calls();
    let err = engine.read_stream(&rx, &mut [&mut buf], TIMEOUT).unwrap_err();
    assert_eq!(err, StreamError::Overflow { time_ns: 4_024_000 });
    // no hardware I/O for the overflow report
    assert_eq!(engine.hardware().rx_calls(), calls);

    let info = engine.read_stream(&rx, &mut [&mut buf], TIMEOUT).unwrap();
    assert_eq!(info.time_ns, 4_024_000);
    assert!(engine.read_stream(&rx, &mut [&mut buf], TIMEOUT).is_ok());
}

#[test]
fn test_oversized_write_never_ends_burst() {
    let (mut engine, tx) = helpers::engine_with_stream(Direction::Tx, "CF32", &[0], "buflen=1024");
    let samples = helpers::generate_tone_cf32(1000.0, 1e6, 1500, 0.5);

    let n = engine
        .write_stream(&tx, &[&samples], StreamFlags::END_BURST, 0, TIMEOUT)
        .unwrap();
    assert_eq!(n, 1024);
    assert!(!engine.hardware().tx_log()[0]
        .flags
        .contains(MetaFlags::TX_BURST_END));
    assert_eq!(
        engine.read_stream_status(&tx, Duration::from_millis(5)),
        Err(StreamError::Timeout)
    );
    assert!(engine.hardware().tx_in_burst());
}

#[test]
fn test_bounded_command_exhausts_exactly() {
    let (mut engine, rx) = helpers::engine_with_stream(Direction::Rx, "CS16", &[0], "buflen=1024");
    engine
        .activate_stream(&rx, StreamFlags::empty(), 0, 2100)
        .unwrap();

    let mut buf = vec![Complex::<i16>::default(); 1024];
    let mut total = 0;
    let mut sizes = Vec::new();
    while engine.pending_commands(&rx) > 0 {
        let info = engine.read_stream(&rx, &mut [&mut buf], TIMEOUT).unwrap();
        total += info.samples;
        sizes.push(info.samples);
    }
    assert_eq!(total, 2100);
    assert_eq!(sizes, [1024, 1024, 52]);
    assert_eq!(
        engine.read_stream(&rx, &mut [&mut buf], TIMEOUT),
        Err(StreamError::Timeout)
    );
}

#[test]
fn test_deactivate_closes_burst_with_one_transfer() {
    let (mut engine, tx) = helpers::engine_with_stream(Direction::Tx, "CS16", &[0], "");
    let samples = helpers::generate_tone_cs16(1000.0, 1e6, 200, 0.5);
    engine
        .write_stream(&tx, &[&samples], StreamFlags::empty(), 0, TIMEOUT)
        .unwrap();
    assert!(engine.hardware().tx_in_burst());

    engine
        .deactivate_stream(&tx, StreamFlags::empty(), 0)
        .unwrap();
    let log = engine.hardware().tx_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].flags, MetaFlags::TX_BURST_END);
    assert_eq!(log[1].num_samples, 1);
    assert_eq!(log[1].samples, [(0, 0)]);
    assert!(!engine.hardware().tx_in_burst());

    // idle: nothing more is sent
    engine
        .deactivate_stream(&tx, StreamFlags::empty(), 0)
        .unwrap();
    assert_eq!(engine.hardware().tx_log().len(), 2);
}
