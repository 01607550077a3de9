//! The synchronous transfer interface (`bladerf_sync_*`).

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::format::SampleFormat;
use crate::meta::Metadata;

/// Maximum number of in-flight transfers the USB layer supports.
pub const MAX_TRANSFERS: u32 = 32;

/// Stream direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Receive (RX) path
    Rx,
    /// Transmit (TX) path
    Tx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => f.write_str("RX"),
            Direction::Tx => f.write_str("TX"),
        }
    }
}

/// Channel layout of a stream (`bladerf_channel_layout`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    /// One receive channel
    RxX1,
    /// One transmit channel
    TxX1,
    /// Two receive channels, sample-interleaved
    RxX2,
    /// Two transmit channels, sample-interleaved
    TxX2,
}

impl ChannelLayout {
    /// Layout for `channels` channels in `direction`.
    ///
    /// Only one or two channels are supported.
    pub fn new(direction: Direction, channels: usize) -> Result<Self> {
        match (direction, channels) {
            (Direction::Rx, 1) => Ok(ChannelLayout::RxX1),
            (Direction::Tx, 1) => Ok(ChannelLayout::TxX1),
            (Direction::Rx, 2) => Ok(ChannelLayout::RxX2),
            (Direction::Tx, 2) => Ok(ChannelLayout::TxX2),
            _ => Err(Error::Invalid(format!(
                "no {} layout for {} channels",
                direction, channels
            ))),
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            ChannelLayout::RxX1 | ChannelLayout::RxX2 => Direction::Rx,
            ChannelLayout::TxX1 | ChannelLayout::TxX2 => Direction::Tx,
        }
    }

    /// Number of interleaved channels.
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::RxX1 | ChannelLayout::TxX1 => 1,
            ChannelLayout::RxX2 | ChannelLayout::TxX2 => 2,
        }
    }
}

/// Parameters for [`SyncTransfer::sync_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub layout: ChannelLayout,
    pub format: SampleFormat,
    /// Number of buffers in the driver's pool.
    pub num_buffers: u32,
    /// Size of each buffer, in samples. Must be a multiple of 1024.
    pub buffer_size: u32,
    /// Number of transfers kept in flight.
    pub num_transfers: u32,
    /// Internal timeout for buffer hand-off.
    pub stream_timeout: Duration,
}

/// Synchronous, timestamp-aware sample transfer primitives.
///
/// This is the driver surface the streaming engine sits on. Sample buffers
/// are raw wire bytes laid out according to the configured
/// [`SampleFormat`]; `num_samples` counts samples summed over all channels
/// (a two-channel transfer of N sample periods is `2 * N`).
pub trait SyncTransfer {
    /// Configure the transfer engine for one direction.
    fn sync_config(&mut self, config: &SyncConfig) -> Result<()>;

    /// Enable or disable a channel's RF front end.
    fn enable_module(&mut self, direction: Direction, channel: usize, enable: bool) -> Result<()>;

    /// Receive `num_samples` samples into `samples`.
    ///
    /// On entry `meta.flags`/`meta.timestamp` select when to start; on
    /// success the driver fills in `meta.timestamp` (of the first sample),
    /// `meta.actual_count` and `meta.status`.
    fn sync_rx(
        &mut self,
        samples: &mut [u8],
        num_samples: usize,
        meta: &mut Metadata,
        timeout: Duration,
    ) -> Result<()>;

    /// Transmit `num_samples` samples from `samples`, honouring the burst
    /// directives in `meta.flags`. The driver reports underruns in
    /// `meta.status`.
    fn sync_tx(
        &mut self,
        samples: &[u8],
        num_samples: usize,
        meta: &mut Metadata,
        timeout: Duration,
    ) -> Result<()>;

    /// Current value of the hardware sample clock for `direction`.
    fn timestamp(&mut self, direction: Direction) -> Result<u64>;

    /// Currently configured sample rate for `direction`, in Hz.
    fn sample_rate(&self, direction: Direction) -> f64;
}

impl<T: SyncTransfer + ?Sized> SyncTransfer for Box<T> {
    fn sync_config(&mut self, config: &SyncConfig) -> Result<()> {
        self.as_mut().sync_config(config)
    }
    fn enable_module(&mut self, direction: Direction, channel: usize, enable: bool) -> Result<()> {
        self.as_mut().enable_module(direction, channel, enable)
    }
    fn sync_rx(
        &mut self,
        samples: &mut [u8],
        num_samples: usize,
        meta: &mut Metadata,
        timeout: Duration,
    ) -> Result<()> {
        self.as_mut().sync_rx(samples, num_samples, meta, timeout)
    }
    fn sync_tx(
        &mut self,
        samples: &[u8],
        num_samples: usize,
        meta: &mut Metadata,
        timeout: Duration,
    ) -> Result<()> {
        self.as_mut().sync_tx(samples, num_samples, meta, timeout)
    }
    fn timestamp(&mut self, direction: Direction) -> Result<u64> {
        self.as_mut().timestamp(direction)
    }
    fn sample_rate(&self, direction: Direction) -> f64 {
        self.as_ref().sample_rate(direction)
    }
}

impl<T: SyncTransfer + ?Sized> SyncTransfer for &mut T {
    fn sync_config(&mut self, config: &SyncConfig) -> Result<()> {
        (**self).sync_config(config)
    }
    fn enable_module(&mut self, direction: Direction, channel: usize, enable: bool) -> Result<()> {
        (**self).enable_module(direction, channel, enable)
    }
    fn sync_rx(
        &mut self,
        samples: &mut [u8],
        num_samples: usize,
        meta: &mut Metadata,
        timeout: Duration,
    ) -> Result<()> {
        (**self).sync_rx(samples, num_samples, meta, timeout)
    }
    fn sync_tx(
        &mut self,
        samples: &[u8],
        num_samples: usize,
        meta: &mut Metadata,
        timeout: Duration,
    ) -> Result<()> {
        (**self).sync_tx(samples, num_samples, meta, timeout)
    }
    fn timestamp(&mut self, direction: Direction) -> Result<u64> {
        (**self).timestamp(direction)
    }
    fn sample_rate(&self, direction: Direction) -> f64 {
        (**self).sample_rate(direction)
    }
}
