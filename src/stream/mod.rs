//! Stream setup, teardown and activation
//!
//! A [`StreamEngine`] owns the driver and at most one stream per direction.
//! Streams are addressed through the [`StreamHandle`] returned by
//! [`StreamEngine::setup_stream`]; the handle is consumed by
//! [`StreamEngine::close_stream`], so a stream cannot be closed twice.
//!
//! Receive calls live in `rx.rs`, transmit and status calls in `tx.rs`.

mod rx;
mod tx;

use std::time::Duration;

use brf_sync::{ChannelLayout, Direction, SyncTransfer};

use crate::args::StreamArgs;
use crate::buffer::ConvBuffer;
use crate::burst::TxBurst;
use crate::convert::HostFormat;
use crate::error::{Error, Result, StreamError};
use crate::flags::StreamFlags;
use crate::queue::{RxCommand, RxCommandQueue, TxResponseQueue};

/// Outcome of a successful `read_stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadInfo {
    /// Sample periods written to each buffer
    pub samples: usize,
    pub flags: StreamFlags,
    /// Time of the first sample
    pub time_ns: i64,
}

/// Handle to a stream set up on a [`StreamEngine`].
///
/// The handle is the only way to release its direction: pass it to
/// [`StreamEngine::close_stream`]. Dropping it instead leaves the direction
/// busy until the engine itself is dropped.
#[must_use = "a dropped handle keeps its direction busy until the engine is dropped"]
#[derive(Debug, PartialEq, Eq)]
pub struct StreamHandle {
    direction: Direction,
}

impl StreamHandle {
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// State of one live stream.
#[derive(Debug)]
pub(crate) struct StreamContext {
    pub(crate) channels: Vec<usize>,
    pub(crate) host_format: HostFormat,
    pub(crate) buffer: ConvBuffer,
    /// Tick expected for the sample after the last one transferred
    pub(crate) next_ticks: u64,
    pub(crate) commands: RxCommandQueue,
    pub(crate) overflow_pending: bool,
    pub(crate) burst: TxBurst,
    pub(crate) responses: TxResponseQueue,
}

impl StreamContext {
    fn new(channels: Vec<usize>, host_format: HostFormat, buffer: ConvBuffer) -> Self {
        Self {
            channels,
            host_format,
            buffer,
            next_ticks: 0,
            commands: RxCommandQueue::new(),
            overflow_pending: false,
            burst: TxBurst::new(),
            responses: TxResponseQueue::new(),
        }
    }

    /// Sample periods a call can move given the caller's buffers.
    ///
    /// Returns `NotSupported` when the sample type or the number of buffers
    /// does not match the stream.
    pub(crate) fn check_call(
        &self,
        format: HostFormat,
        lens: &[usize],
    ) -> std::result::Result<usize, StreamError> {
        if format != self.host_format || lens.len() != self.channels.len() {
            return Err(StreamError::NotSupported);
        }
        Ok(lens.iter().copied().min().unwrap_or(0))
    }
}

/// Timestamped streaming on top of a [`SyncTransfer`] driver.
pub struct StreamEngine<H: SyncTransfer> {
    hw: H,
    rx: Option<StreamContext>,
    tx: Option<StreamContext>,
}

impl<H: SyncTransfer> StreamEngine<H> {
    pub fn new(hw: H) -> Self {
        Self {
            hw,
            rx: None,
            tx: None,
        }
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    fn slot(&mut self, direction: Direction) -> &mut Option<StreamContext> {
        match direction {
            Direction::Rx => &mut self.rx,
            Direction::Tx => &mut self.tx,
        }
    }

    /// The driver and the context behind `handle`.
    pub(crate) fn parts(
        &mut self,
        handle: &StreamHandle,
    ) -> std::result::Result<(&mut H, &mut StreamContext), StreamError> {
        let ctx = match handle.direction {
            Direction::Rx => self.rx.as_mut(),
            Direction::Tx => self.tx.as_mut(),
        };
        ctx.map(|ctx| (&mut self.hw, ctx))
            .ok_or(StreamError::StreamError)
    }

    /// Set up a stream.
    ///
    /// `host_format` is `"CF32"` or `"CS16"`; `channels` is `[0]`, `[1]` or
    /// `[0, 1]` (empty means `[0]`). See [`StreamArgs`] for the options.
    pub fn setup_stream(
        &mut self,
        direction: Direction,
        host_format: &str,
        channels: &[usize],
        args: &StreamArgs,
    ) -> Result<StreamHandle> {
        if self.slot(direction).is_some() {
            return Err(Error::StreamBusy(direction));
        }

        let channels = if channels.is_empty() {
            vec![0]
        } else {
            channels.to_vec()
        };
        let params = args.resolve()?;

        let count = match channels.as_slice() {
            [0] | [1] => 1,
            [0, 1] => 2,
            _ => return Err(Error::InvalidChannels(channels)),
        };
        let layout = ChannelLayout::new(direction, count)
            .map_err(|_| Error::InvalidChannels(channels.clone()))?;

        tracing::info!("Sample format: {}", params.format.driver_name());
        let host_format: HostFormat = host_format.parse()?;

        self.hw
            .sync_config(&params.sync_config(layout))
            .map_err(|e| Error::hardware("bladerf_sync_config", e))?;

        for (idx, &ch) in channels.iter().enumerate() {
            if let Err(e) = self.hw.enable_module(direction, ch, true) {
                for &prev in &channels[..idx] {
                    if let Err(e) = self.hw.enable_module(direction, prev, false) {
                        tracing::debug!("Failed to disable {} channel {}: {}", direction, prev, e);
                    }
                }
                return Err(Error::hardware("bladerf_enable_module", e));
            }
        }

        let buffer = ConvBuffer::new(params.format, params.buffer_size as usize, channels.len());
        tracing::debug!(
            "{} stream: channels {:?}, {} host samples, mtu {}",
            direction,
            channels,
            host_format,
            buffer.capacity()
        );
        *self.slot(direction) = Some(StreamContext::new(channels, host_format, buffer));

        Ok(StreamHandle { direction })
    }

    /// Tear down a stream, disabling its channels.
    ///
    /// Every channel is disabled even if one fails; the stream is released
    /// either way and the first failure is returned.
    pub fn close_stream(&mut self, handle: StreamHandle) -> Result<()> {
        let direction = handle.direction;
        let Some(ctx) = self.slot(direction).take() else {
            return Ok(());
        };

        let mut result = Ok(());
        for &ch in &ctx.channels {
            if let Err(e) = self.hw.enable_module(direction, ch, false) {
                let err = Error::hardware("bladerf_enable_module", e);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        tracing::debug!("{} stream closed", direction);
        result
    }

    /// Largest number of sample periods one call can move.
    pub fn mtu(&self, handle: &StreamHandle) -> usize {
        let ctx = match handle.direction {
            Direction::Rx => self.rx.as_ref(),
            Direction::Tx => self.tx.as_ref(),
        };
        ctx.map_or(0, |ctx| ctx.buffer.capacity())
    }

    /// Channels of the stream behind `handle`.
    pub fn channels(&self, handle: &StreamHandle) -> &[usize] {
        let ctx = match handle.direction {
            Direction::Rx => self.rx.as_ref(),
            Direction::Tx => self.tx.as_ref(),
        };
        ctx.map(|ctx| ctx.channels.as_slice()).unwrap_or(&[])
    }

    /// Receive commands still queued on the stream.
    pub fn pending_commands(&self, handle: &StreamHandle) -> usize {
        match (handle.direction, &self.rx) {
            (Direction::Rx, Some(ctx)) => ctx.commands.len(),
            _ => 0,
        }
    }

    /// Activate a stream.
    ///
    /// On a receive stream this queues a command: `num_elems` sample periods
    /// (0 for continuous), starting at `time_ns` if `flags` has `HAS_TIME`.
    /// Transmit streams accept no flags.
    pub fn activate_stream(
        &mut self,
        handle: &StreamHandle,
        flags: StreamFlags,
        time_ns: i64,
        num_elems: usize,
    ) -> std::result::Result<(), StreamError> {
        let (_, ctx) = self.parts(handle)?;
        match handle.direction {
            Direction::Rx => {
                ctx.commands.push(RxCommand {
                    flags,
                    time_ns,
                    num_elems,
                });
                Ok(())
            }
            Direction::Tx if !flags.is_empty() => Err(StreamError::NotSupported),
            Direction::Tx => Ok(()),
        }
    }

    /// Deactivate a stream.
    ///
    /// Drops pending receive commands, or closes an open transmit burst.
    pub fn deactivate_stream(
        &mut self,
        handle: &StreamHandle,
        flags: StreamFlags,
        _time_ns: i64,
    ) -> std::result::Result<(), StreamError> {
        if !flags.is_empty() {
            return Err(StreamError::NotSupported);
        }
        let (hw, ctx) = self.parts(handle)?;
        match handle.direction {
            Direction::Rx => ctx.commands.clear(),
            Direction::Tx => tx::close_burst(hw, ctx),
        }
        Ok(())
    }

    /// Minimum receive timeout: two buffers' worth of samples.
    pub(crate) fn rx_min_timeout(hw: &H, ctx: &StreamContext) -> Duration {
        let rate = hw.sample_rate(Direction::Rx);
        if rate > 0.0 {
            Duration::from_secs_f64(2.0 * ctx.buffer.capacity() as f64 / rate)
        } else {
            Duration::ZERO
        }
    }
}

impl<H: SyncTransfer> Drop for StreamEngine<H> {
    fn drop(&mut self) {
        for direction in [Direction::Rx, Direction::Tx] {
            if let Some(ctx) = self.slot(direction).take() {
                for &ch in &ctx.channels {
                    if let Err(e) = self.hw.enable_module(direction, ch, false) {
                        tracing::debug!("Failed to disable {} channel {}: {}", direction, ch, e);
                    }
                }
                tracing::debug!("{} stream released on drop", direction);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brf_sync::{Error as HwError, SampleFormat, SimTransceiver};

    fn engine() -> StreamEngine<SimTransceiver> {
        StreamEngine::new(SimTransceiver::new())
    }

    #[test]
    fn test_setup_defaults() {
        let mut engine = engine();
        let handle = engine
            .setup_stream(Direction::Rx, "CF32", &[], &StreamArgs::new())
            .unwrap();

        assert_eq!(handle.direction(), Direction::Rx);
        assert_eq!(engine.mtu(&handle), 4096);
        let config = engine.hardware().config(Direction::Rx).unwrap();
        assert_eq!(config.layout, ChannelLayout::RxX1);
        assert_eq!(config.format, SampleFormat::Sc16Q11Meta);
        assert_eq!(config.num_buffers, 32);
        assert_eq!(config.num_transfers, 16);
        assert_eq!(config.stream_timeout, Duration::from_secs(1));
        assert!(engine.hardware().is_enabled(Direction::Rx, 0));
    }

    #[test]
    fn test_setup_dual_channel() {
        let mut engine = engine();
        let args: StreamArgs = "buflen=2000, format=sc8".parse().unwrap();
        let handle = engine
            .setup_stream(Direction::Tx, "cs16", &[0, 1], &args)
            .unwrap();

        assert_eq!(engine.mtu(&handle), 2048);
        assert_eq!(engine.channels(&handle), &[0, 1]);
        let config = engine.hardware().config(Direction::Tx).unwrap();
        assert_eq!(config.layout, ChannelLayout::TxX2);
        assert_eq!(config.format, SampleFormat::Sc8Q7);
        assert!(engine.hardware().is_enabled(Direction::Tx, 1));
    }

    #[test]
    fn test_setup_rejects_bad_input() {
        let mut engine = engine();
        let args = StreamArgs::new();
        assert!(matches!(
            engine.setup_stream(Direction::Rx, "CF32", &[1, 0], &args),
            Err(Error::InvalidChannels(_))
        ));
        assert!(matches!(
            engine.setup_stream(Direction::Rx, "CF32", &[2], &args),
            Err(Error::InvalidChannels(_))
        ));
        assert!(matches!(
            engine.setup_stream(Direction::Rx, "CU8", &[0], &args),
            Err(Error::InvalidHostFormat(_))
        ));
        let args = StreamArgs::from_pairs([("format", "sc32")]);
        assert!(matches!(
            engine.setup_stream(Direction::Rx, "CF32", &[0], &args),
            Err(Error::InvalidWireFormat(_))
        ));
        assert!(engine.hardware().config(Direction::Rx).is_none());
    }

    #[test]
    fn test_setup_busy_direction() {
        let mut engine = engine();
        let _rx = engine
            .setup_stream(Direction::Rx, "CF32", &[0], &StreamArgs::new())
            .unwrap();
        assert!(matches!(
            engine.setup_stream(Direction::Rx, "CS16", &[1], &StreamArgs::new()),
            Err(Error::StreamBusy(Direction::Rx))
        ));
        assert!(engine
            .setup_stream(Direction::Tx, "CS16", &[0], &StreamArgs::new())
            .is_ok());
    }

    #[test]
    fn test_config_failure_is_fatal() {
        let mut engine = engine();
        engine
            .hardware_mut()
            .fail_config(HwError::Device(brf_sync::ErrorCode::NoDev));
        let err = engine
            .setup_stream(Direction::Rx, "CF32", &[0], &StreamArgs::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Hardware {
                context: "bladerf_sync_config",
                ..
            }
        ));
        assert!(engine.hardware().enable_log().is_empty());
    }

    #[test]
    fn test_enable_failure_rolls_back() {
        let mut engine = engine();
        engine.hardware_mut().fail_module(Direction::Rx, 1);
        let err = engine
            .setup_stream(Direction::Rx, "CF32", &[0, 1], &StreamArgs::new())
            .unwrap_err();
        assert!(matches!(err, Error::Hardware { .. }));
        assert!(!engine.hardware().is_enabled(Direction::Rx, 0));
        assert_eq!(
            engine.hardware().enable_log(),
            &[
                (Direction::Rx, 0, true),
                (Direction::Rx, 1, true),
                (Direction::Rx, 0, false),
            ]
        );

        // the direction is still free
        assert!(engine
            .setup_stream(Direction::Rx, "CF32", &[0], &StreamArgs::new())
            .is_ok());
    }

    #[test]
    fn test_dropped_handle_keeps_direction_busy() {
        let mut engine = engine();
        let rx = engine
            .setup_stream(Direction::Rx, "CF32", &[0], &StreamArgs::new())
            .unwrap();
        drop(rx);
        assert!(matches!(
            engine.setup_stream(Direction::Rx, "CF32", &[0], &StreamArgs::new()),
            Err(Error::StreamBusy(Direction::Rx))
        ));
        assert!(engine.hardware().is_enabled(Direction::Rx, 0));
    }

    #[test]
    fn test_close_disables_channels() {
        let mut engine = engine();
        let handle = engine
            .setup_stream(Direction::Rx, "CS16", &[0, 1], &StreamArgs::new())
            .unwrap();
        engine.close_stream(handle).unwrap();
        assert!(!engine.hardware().is_enabled(Direction::Rx, 0));
        assert!(!engine.hardware().is_enabled(Direction::Rx, 1));

        // closed direction can be set up again
        assert!(engine
            .setup_stream(Direction::Rx, "CS16", &[0], &StreamArgs::new())
            .is_ok());
    }

    #[test]
    fn test_drop_disables_channels() {
        let mut sim = SimTransceiver::new();
        {
            let mut engine = StreamEngine::new(&mut sim);
            let _tx = engine
                .setup_stream(Direction::Tx, "CF32", &[1], &StreamArgs::new())
                .unwrap();
            assert!(engine.hardware().is_enabled(Direction::Tx, 1));
        }
        assert!(!sim.is_enabled(Direction::Tx, 1));
    }

    #[test]
    fn test_activation_flags() {
        let mut engine = engine();
        let rx = engine
            .setup_stream(Direction::Rx, "CF32", &[0], &StreamArgs::new())
            .unwrap();
        let tx = engine
            .setup_stream(Direction::Tx, "CF32", &[0], &StreamArgs::new())
            .unwrap();

        assert_eq!(
            engine.activate_stream(&tx, StreamFlags::HAS_TIME, 1000, 0),
            Err(StreamError::NotSupported)
        );
        assert_eq!(engine.activate_stream(&tx, StreamFlags::empty(), 0, 0), Ok(()));
        assert_eq!(
            engine.activate_stream(&rx, StreamFlags::HAS_TIME, 1000, 10),
            Ok(())
        );
        assert_eq!(
            engine.deactivate_stream(&rx, StreamFlags::END_BURST, 0),
            Err(StreamError::NotSupported)
        );
        assert_eq!(engine.pending_commands(&rx), 1);
        assert_eq!(engine.deactivate_stream(&rx, StreamFlags::empty(), 0), Ok(()));
        assert_eq!(engine.pending_commands(&rx), 0);
    }
}
