//! Simulated transceiver for development and testing
//!
//! [`SimTransceiver`] implements [`SyncTransfer`] entirely in software. It
//! keeps one sample clock per direction, synthesizes receive samples from a
//! configurable source, records every transmit call, and lets tests script
//! driver failures and status bits for upcoming transfers.
//!
//! By default the clocks only move when samples are transferred (or when a
//! test moves them), which keeps tests deterministic. A free-running mode
//! ties the clocks to wall time for demos.

use std::collections::{HashSet, VecDeque};
use std::f64::consts::PI;
use std::time::{Duration, Instant};

use crate::error::{Error, ErrorCode, Result};
use crate::format::SampleFormat;
use crate::meta::{MetaFlags, MetaStatus, Metadata};
use crate::sync::{Direction, SyncConfig, SyncTransfer};

/// Default sample rate of both paths, in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 1_000_000.0;

/// Waveform produced on the receive path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RxSource {
    /// Complex tone at `freq` Hz; `amplitude` is a fraction of full scale.
    /// Channel 1 lags channel 0 by a quarter turn.
    Tone { freq: f64, amplitude: f64 },
    /// `I = (tick + 64 * channel) % 256 - 128`, `Q = !I`. Fits every wire format.
    Ramp,
    /// The same components for every sample.
    Constant(i16, i16),
}

impl Default for RxSource {
    fn default() -> Self {
        RxSource::Tone {
            freq: 10_000.0,
            amplitude: 0.5,
        }
    }
}

/// One recorded `sync_tx` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TxRecord {
    /// Directive flags as passed by the caller.
    pub flags: MetaFlags,
    /// Tick at which the first sample went out.
    pub start_tick: u64,
    /// Samples summed over all channels.
    pub num_samples: usize,
    /// Decoded components, in wire order.
    pub samples: Vec<(i16, i16)>,
}

#[derive(Debug, Default)]
struct SimPath {
    config: Option<SyncConfig>,
    enabled: [bool; 2],
    clock: u64,
    sample_rate: f64,
    in_burst: bool,
    last_timeout: Option<Duration>,
    faults: VecDeque<Error>,
    status: VecDeque<MetaStatus>,
}

impl SimPath {
    fn new() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            ..Default::default()
        }
    }

    fn format(&self, direction: Direction) -> Result<SampleFormat> {
        self.config
            .as_ref()
            .map(|c| c.format)
            .ok_or_else(|| Error::Invalid(format!("{} stream not configured", direction)))
    }

    fn channels(&self) -> usize {
        self.config.as_ref().map_or(1, |c| c.layout.channels())
    }
}

/// Software model of a bladeRF's synchronous transfer engine.
#[derive(Debug)]
pub struct SimTransceiver {
    rx: SimPath,
    tx: SimPath,
    rx_source: RxSource,
    rx_short_read: Option<usize>,
    rx_calls: usize,
    tx_log: Vec<TxRecord>,
    enable_log: Vec<(Direction, usize, bool)>,
    failing_modules: HashSet<(Direction, usize)>,
    config_fault: Option<Error>,
    timestamp_fault: bool,
    origin: Option<Instant>,
}

impl Default for SimTransceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTransceiver {
    /// Create a simulator with manually driven clocks.
    pub fn new() -> Self {
        Self {
            rx: SimPath::new(),
            tx: SimPath::new(),
            rx_source: RxSource::default(),
            rx_short_read: None,
            rx_calls: 0,
            tx_log: Vec::new(),
            enable_log: Vec::new(),
            failing_modules: HashSet::new(),
            config_fault: None,
            timestamp_fault: false,
            origin: None,
        }
    }

    /// Create a simulator whose clocks follow wall time.
    pub fn free_running() -> Self {
        Self {
            origin: Some(Instant::now()),
            ..Self::new()
        }
    }

    fn path(&self, direction: Direction) -> &SimPath {
        match direction {
            Direction::Rx => &self.rx,
            Direction::Tx => &self.tx,
        }
    }

    fn path_mut(&mut self, direction: Direction) -> &mut SimPath {
        match direction {
            Direction::Rx => &mut self.rx,
            Direction::Tx => &mut self.tx,
        }
    }

    /// Current tick of `direction`, catching up with wall time when free-running.
    fn now(&mut self, direction: Direction) -> u64 {
        let origin = self.origin;
        let path = self.path_mut(direction);
        if let Some(origin) = origin {
            let wall = (origin.elapsed().as_secs_f64() * path.sample_rate) as u64;
            path.clock = path.clock.max(wall);
        }
        path.clock
    }

    pub fn set_sample_rate(&mut self, direction: Direction, rate: f64) {
        self.path_mut(direction).sample_rate = rate;
    }

    /// Set the clock of `direction` to `ticks`.
    pub fn set_time(&mut self, direction: Direction, ticks: u64) {
        self.path_mut(direction).clock = ticks;
    }

    /// Move the clock of `direction` forward by `ticks`.
    pub fn advance(&mut self, direction: Direction, ticks: u64) {
        self.path_mut(direction).clock += ticks;
    }

    pub fn set_rx_source(&mut self, source: RxSource) {
        self.rx_source = source;
    }

    /// Cap the samples per channel delivered by each receive call.
    pub fn set_rx_short_read(&mut self, limit: Option<usize>) {
        self.rx_short_read = limit;
    }

    /// Make the next transfer in `direction` fail with `err`.
    pub fn push_fault(&mut self, direction: Direction, err: Error) {
        self.path_mut(direction).faults.push_back(err);
    }

    /// Report `status` on the next successful transfer in `direction`.
    pub fn push_status(&mut self, direction: Direction, status: MetaStatus) {
        self.path_mut(direction).status.push_back(status);
    }

    /// Make enabling `channel` in `direction` fail.
    pub fn fail_module(&mut self, direction: Direction, channel: usize) {
        self.failing_modules.insert((direction, channel));
    }

    /// Make the next `sync_config` call fail with `err`.
    pub fn fail_config(&mut self, err: Error) {
        self.config_fault = Some(err);
    }

    /// Make clock readback fail until reset.
    pub fn fail_timestamp(&mut self, fail: bool) {
        self.timestamp_fault = fail;
    }

    pub fn config(&self, direction: Direction) -> Option<&SyncConfig> {
        self.path(direction).config.as_ref()
    }

    pub fn is_enabled(&self, direction: Direction, channel: usize) -> bool {
        self.path(direction)
            .enabled
            .get(channel)
            .copied()
            .unwrap_or(false)
    }

    /// Every `enable_module` call, in order.
    pub fn enable_log(&self) -> &[(Direction, usize, bool)] {
        &self.enable_log
    }

    /// Every successful `sync_tx` call, in order.
    pub fn tx_log(&self) -> &[TxRecord] {
        &self.tx_log
    }

    pub fn clear_tx_log(&mut self) {
        self.tx_log.clear();
    }

    /// Timeout passed to the most recent transfer in `direction`.
    pub fn last_timeout(&self, direction: Direction) -> Option<Duration> {
        self.path(direction).last_timeout
    }

    /// Number of `sync_rx` calls that reached the simulator.
    pub fn rx_calls(&self) -> usize {
        self.rx_calls
    }

    /// Whether the simulated TX path has an open burst.
    pub fn tx_in_burst(&self) -> bool {
        self.tx.in_burst
    }

    fn rx_components(&self, format: SampleFormat, tick: u64, channel: usize) -> (i16, i16) {
        match self.rx_source {
            RxSource::Tone { freq, amplitude } => {
                let phase = 2.0 * PI * freq * tick as f64 / self.rx.sample_rate
                    - channel as f64 * PI / 2.0;
                let scale = amplitude * format.full_scale() as f64;
                (
                    (scale * phase.cos()).round() as i16,
                    (scale * phase.sin()).round() as i16,
                )
            }
            RxSource::Ramp => {
                let i = ((tick + 64 * channel as u64) % 256) as i16 - 128;
                (i, !i)
            }
            RxSource::Constant(i, q) => (i, q),
        }
    }
}

fn check_len(format: SampleFormat, len: usize, num_samples: usize, channels: usize) -> Result<()> {
    if num_samples % channels != 0 {
        return Err(Error::Invalid(format!(
            "{} samples do not divide into {} channels",
            num_samples, channels
        )));
    }
    if len < format.bytes_for(num_samples) {
        return Err(Error::Invalid(format!(
            "buffer of {} bytes too small for {} samples",
            len, num_samples
        )));
    }
    Ok(())
}

impl SyncTransfer for SimTransceiver {
    fn sync_config(&mut self, config: &SyncConfig) -> Result<()> {
        if let Some(err) = self.config_fault.take() {
            return Err(err);
        }
        if config.buffer_size == 0 || config.buffer_size % 1024 != 0 {
            return Err(Error::Invalid(format!(
                "buffer size {} is not a multiple of 1024",
                config.buffer_size
            )));
        }
        if config.num_transfers == 0 || config.num_transfers > config.num_buffers {
            return Err(Error::Invalid(format!(
                "{} transfers with {} buffers",
                config.num_transfers, config.num_buffers
            )));
        }
        if config.num_transfers > crate::MAX_TRANSFERS {
            return Err(Error::Device(ErrorCode::Range));
        }

        tracing::debug!(
            "sim: {:?} {} buffers x {} samples, {} transfers",
            config.layout,
            config.num_buffers,
            config.buffer_size,
            config.num_transfers
        );
        let path = self.path_mut(config.layout.direction());
        path.config = Some(config.clone());
        path.in_burst = false;
        Ok(())
    }

    fn enable_module(&mut self, direction: Direction, channel: usize, enable: bool) -> Result<()> {
        self.enable_log.push((direction, channel, enable));
        if channel > 1 {
            return Err(Error::Invalid(format!("no channel {}", channel)));
        }
        if enable && self.failing_modules.contains(&(direction, channel)) {
            return Err(Error::Device(ErrorCode::Io));
        }
        self.path_mut(direction).enabled[channel] = enable;
        Ok(())
    }

    fn sync_rx(
        &mut self,
        samples: &mut [u8],
        num_samples: usize,
        meta: &mut Metadata,
        timeout: Duration,
    ) -> Result<()> {
        self.rx_calls += 1;
        self.rx.last_timeout = Some(timeout);
        if let Some(err) = self.rx.faults.pop_front() {
            return Err(err);
        }
        let format = self.rx.format(Direction::Rx)?;
        let channels = self.rx.channels();
        check_len(format, samples.len(), num_samples, channels)?;

        let now = self.now(Direction::Rx);
        let start = if meta.flags.contains(MetaFlags::RX_NOW) {
            now
        } else if meta.timestamp < now {
            return Err(Error::TimePast);
        } else {
            meta.timestamp
        };

        let mut per_channel = num_samples / channels;
        if let Some(limit) = self.rx_short_read {
            per_channel = per_channel.min(limit);
        }
        for n in 0..per_channel {
            for ch in 0..channels {
                let (i, q) = self.rx_components(format, start + n as u64, ch);
                format.write_iq(samples, n * channels + ch, i, q);
            }
        }

        self.rx.clock = start + per_channel as u64;
        meta.timestamp = start;
        meta.actual_count = per_channel * channels;
        meta.status = self.rx.status.pop_front().unwrap_or_default();
        Ok(())
    }

    fn sync_tx(
        &mut self,
        samples: &[u8],
        num_samples: usize,
        meta: &mut Metadata,
        timeout: Duration,
    ) -> Result<()> {
        self.tx.last_timeout = Some(timeout);
        if let Some(err) = self.tx.faults.pop_front() {
            return Err(err);
        }
        let format = self.tx.format(Direction::Tx)?;
        let channels = self.tx.channels();
        check_len(format, samples.len(), num_samples, channels)?;

        let now = self.now(Direction::Tx);
        let flags = meta.flags;
        let start = if flags.contains(MetaFlags::TX_BURST_START) {
            if self.tx.in_burst {
                return Err(Error::Invalid("burst already in progress".to_string()));
            }
            if flags.contains(MetaFlags::TX_NOW) {
                now
            } else if meta.timestamp < now {
                return Err(Error::TimePast);
            } else {
                meta.timestamp
            }
        } else if !self.tx.in_burst {
            return Err(Error::Invalid("no burst in progress".to_string()));
        } else if flags.contains(MetaFlags::TX_UPDATE_TIMESTAMP) {
            if meta.timestamp < now {
                return Err(Error::TimePast);
            }
            meta.timestamp
        } else {
            now
        };

        let decoded = (0..num_samples)
            .map(|n| format.read_iq(samples, n))
            .collect();
        self.tx_log.push(TxRecord {
            flags,
            start_tick: start,
            num_samples,
            samples: decoded,
        });

        self.tx.clock = start + (num_samples / channels) as u64;
        self.tx.in_burst = !flags.contains(MetaFlags::TX_BURST_END);
        meta.actual_count = num_samples;
        meta.status = self.tx.status.pop_front().unwrap_or_default();
        Ok(())
    }

    fn timestamp(&mut self, direction: Direction) -> Result<u64> {
        if self.timestamp_fault {
            return Err(Error::Device(ErrorCode::Io));
        }
        Ok(self.now(direction))
    }

    fn sample_rate(&self, direction: Direction) -> f64 {
        self.path(direction).sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ChannelLayout;

    fn config(layout: ChannelLayout, format: SampleFormat) -> SyncConfig {
        SyncConfig {
            layout,
            format,
            num_buffers: 16,
            buffer_size: 1024,
            num_transfers: 8,
            stream_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_rejects_unaligned_buffer_size() {
        let mut sim = SimTransceiver::new();
        let mut cfg = config(ChannelLayout::RxX1, SampleFormat::Sc16Q11);
        cfg.buffer_size = 1000;
        assert!(sim.sync_config(&cfg).is_err());
        assert!(sim.config(Direction::Rx).is_none());
    }

    #[test]
    fn test_rx_now_uses_current_clock() {
        let mut sim = SimTransceiver::new();
        sim.sync_config(&config(ChannelLayout::RxX1, SampleFormat::Sc16Q11))
            .unwrap();
        sim.set_time(Direction::Rx, 500);
        sim.set_rx_source(RxSource::Ramp);

        let mut buf = vec![0u8; 4 * 16];
        let mut meta = Metadata {
            flags: MetaFlags::RX_NOW,
            ..Default::default()
        };
        sim.sync_rx(&mut buf, 16, &mut meta, Duration::from_millis(10))
            .unwrap();

        assert_eq!(meta.timestamp, 500);
        assert_eq!(meta.actual_count, 16);
        assert_eq!(sim.timestamp(Direction::Rx).unwrap(), 516);
        let i = (500 % 256) as i16 - 128;
        assert_eq!(SampleFormat::Sc16Q11.read_iq(&buf, 0), (i, !i));
    }

    #[test]
    fn test_rx_timestamp_in_past() {
        let mut sim = SimTransceiver::new();
        sim.sync_config(&config(ChannelLayout::RxX1, SampleFormat::Sc8Q7))
            .unwrap();
        sim.set_time(Direction::Rx, 1000);

        let mut buf = vec![0u8; 2 * 8];
        let mut meta = Metadata {
            timestamp: 10,
            ..Default::default()
        };
        let err = sim
            .sync_rx(&mut buf, 8, &mut meta, Duration::from_millis(10))
            .unwrap_err();
        assert_eq!(err, Error::TimePast);
    }

    #[test]
    fn test_tx_burst_bookkeeping() {
        let mut sim = SimTransceiver::new();
        sim.sync_config(&config(ChannelLayout::TxX1, SampleFormat::Sc16Q11))
            .unwrap();
        let buf = vec![0u8; 4 * 4];

        let mut meta = Metadata {
            flags: MetaFlags::TX_BURST_START | MetaFlags::TX_NOW,
            ..Default::default()
        };
        sim.sync_tx(&buf, 4, &mut meta, Duration::from_millis(10))
            .unwrap();
        assert!(sim.tx_in_burst());

        let mut meta = Metadata {
            flags: MetaFlags::TX_BURST_START,
            timestamp: 100,
            ..Default::default()
        };
        assert!(sim
            .sync_tx(&buf, 4, &mut meta, Duration::from_millis(10))
            .is_err());

        let mut meta = Metadata {
            flags: MetaFlags::TX_BURST_END,
            ..Default::default()
        };
        sim.sync_tx(&buf, 4, &mut meta, Duration::from_millis(10))
            .unwrap();
        assert!(!sim.tx_in_burst());
        assert_eq!(sim.tx_log().len(), 2);
        assert_eq!(sim.tx_log()[1].start_tick, 4);
    }

    #[test]
    fn test_scripted_fault_and_status() {
        let mut sim = SimTransceiver::new();
        sim.sync_config(&config(ChannelLayout::RxX1, SampleFormat::Sc16Q11))
            .unwrap();
        sim.push_fault(Direction::Rx, Error::Timeout);
        sim.push_status(Direction::Rx, MetaStatus::OVERRUN);

        let mut buf = vec![0u8; 4 * 4];
        let mut meta = Metadata {
            flags: MetaFlags::RX_NOW,
            ..Default::default()
        };
        assert_eq!(
            sim.sync_rx(&mut buf, 4, &mut meta, Duration::ZERO),
            Err(Error::Timeout)
        );
        sim.sync_rx(&mut buf, 4, &mut meta, Duration::ZERO).unwrap();
        assert!(meta.status.contains(MetaStatus::OVERRUN));
        assert_eq!(sim.rx_calls(), 2);
    }

    #[test]
    fn test_records_transfer_timeout() {
        let mut sim = SimTransceiver::new();
        sim.sync_config(&config(ChannelLayout::RxX1, SampleFormat::Sc16Q11))
            .unwrap();
        assert_eq!(sim.last_timeout(Direction::Rx), None);

        sim.push_fault(Direction::Rx, Error::Timeout);
        let mut buf = vec![0u8; 4 * 4];
        let mut meta = Metadata {
            flags: MetaFlags::RX_NOW,
            ..Default::default()
        };
        let _ = sim.sync_rx(&mut buf, 4, &mut meta, Duration::from_millis(7));
        assert_eq!(
            sim.last_timeout(Direction::Rx),
            Some(Duration::from_millis(7))
        );
        assert_eq!(sim.last_timeout(Direction::Tx), None);
    }

    #[test]
    fn test_module_failure_is_logged() {
        let mut sim = SimTransceiver::new();
        sim.fail_module(Direction::Tx, 1);
        assert!(sim.enable_module(Direction::Tx, 0, true).is_ok());
        assert!(sim.enable_module(Direction::Tx, 1, true).is_err());
        assert!(sim.is_enabled(Direction::Tx, 0));
        assert!(!sim.is_enabled(Direction::Tx, 1));
        assert_eq!(sim.enable_log().len(), 2);
    }
}
