use std::time::{Duration, Instant};

use brf_sync::{Direction, MetaFlags, MetaStatus, Metadata, SyncTransfer};

use super::{StreamContext, StreamEngine, StreamHandle};
use crate::convert::HostSample;
use crate::error::StreamError;
use crate::flags::StreamFlags;
use crate::queue::TxResponse;
use crate::time::TimeConverter;

/// Timeout of the transfer that closes a burst on deactivation.
const CLOSE_BURST_TIMEOUT: Duration = Duration::from_millis(100);
/// Upper bound on one sleep of the status poll.
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// End an open burst with a single zero-valued sample period.
pub(super) fn close_burst<H: SyncTransfer>(hw: &mut H, ctx: &mut StreamContext) {
    if ctx.burst.is_open() {
        let channels = ctx.channels.len();
        ctx.buffer.clear(1);
        let mut meta = Metadata {
            flags: MetaFlags::TX_BURST_END,
            ..Default::default()
        };
        let sent = hw.sync_tx(
            ctx.buffer.as_bytes(),
            channels,
            &mut meta,
            CLOSE_BURST_TIMEOUT,
        );
        if let Err(e) = sent {
            tracing::warn!("Failed to close TX burst: {}", e);
        }
    }
    ctx.burst.force_idle();
}

impl<H: SyncTransfer> StreamEngine<H> {
    /// Write samples to a transmit stream, one buffer per channel.
    ///
    /// Returns the number of sample periods accepted, at most the MTU. A
    /// call that cannot take every sample does not end the burst even when
    /// `END_BURST` is set. Underflows and burst completions are reported
    /// through [`read_stream_status`](Self::read_stream_status).
    pub fn write_stream<T: HostSample>(
        &mut self,
        handle: &StreamHandle,
        bufs: &[&[T]],
        flags: StreamFlags,
        time_ns: i64,
        timeout: Duration,
    ) -> Result<usize, StreamError> {
        if handle.direction() != Direction::Tx {
            return Err(StreamError::NotSupported);
        }
        let (hw, ctx) = self.parts(handle)?;
        let lens: Vec<usize> = bufs.iter().map(|b| b.len()).collect();
        let requested = ctx.check_call(T::FORMAT, &lens)?;

        let capacity = ctx.buffer.capacity();
        let end_burst = flags.contains(StreamFlags::END_BURST) && requested <= capacity;
        let count = requested.min(capacity);

        let clock = TimeConverter::new(hw.sample_rate(Direction::Tx));
        let time = flags
            .contains(StreamFlags::HAS_TIME)
            .then(|| clock.ns_to_ticks(time_ns));
        let plan = ctx.burst.plan(time, end_burst);

        if let Some(ticks) = time {
            ctx.next_ticks = ticks;
        }
        if plan.seed_from_hardware {
            match hw.timestamp(Direction::Tx) {
                Ok(ticks) => ctx.next_ticks = ticks,
                Err(e) => tracing::warn!("bladerf_get_timestamp() returned {}", e),
            }
        }

        ctx.buffer.write_from(bufs, count);
        let mut meta = Metadata {
            flags: plan.flags,
            timestamp: plan.timestamp,
            ..Default::default()
        };
        let channels = ctx.channels.len();
        hw.sync_tx(ctx.buffer.as_bytes(), count * channels, &mut meta, timeout)
            .map_err(|e| StreamError::from_transfer("bladerf_sync_tx", &e))?;

        ctx.next_ticks += count as u64;

        if meta.status.contains(MetaStatus::UNDERRUN) {
            tracing::info!("U");
            ctx.responses.push(TxResponse {
                flags: StreamFlags::empty(),
                time_ns: 0,
                status: Err(StreamError::Underflow),
            });
        }
        if end_burst {
            ctx.responses.push(TxResponse {
                flags: StreamFlags::END_BURST | StreamFlags::HAS_TIME,
                time_ns: clock.ticks_to_ns(ctx.next_ticks),
                status: Ok(()),
            });
        }
        ctx.burst.on_sent(end_burst);

        Ok(count)
    }

    /// Write every sample, splitting the buffers into MTU-sized calls.
    ///
    /// `HAS_TIME` applies to the first call only; `END_BURST` takes effect
    /// on the call carrying the last sample.
    pub fn write_all<T: HostSample>(
        &mut self,
        handle: &StreamHandle,
        bufs: &[&[T]],
        flags: StreamFlags,
        time_ns: i64,
        timeout: Duration,
    ) -> Result<usize, StreamError> {
        let total = bufs.iter().map(|b| b.len()).min().unwrap_or(0);
        let mut written = 0;
        let mut call_flags = flags;

        while written < total {
            let chunk: Vec<&[T]> = bufs.iter().map(|b| &b[written..total]).collect();
            let n = self.write_stream(handle, &chunk, call_flags, time_ns, timeout)?;
            if n == 0 {
                return Err(StreamError::Timeout);
            }
            written += n;
            call_flags.remove(StreamFlags::HAS_TIME);
        }
        Ok(written)
    }

    /// Wait for the next transmit event.
    ///
    /// Events carrying a time are held back until the transmit clock has
    /// reached it. Returns [`StreamError::Timeout`] if nothing becomes
    /// available within `timeout`.
    pub fn read_stream_status(
        &mut self,
        handle: &StreamHandle,
        timeout: Duration,
    ) -> Result<TxResponse, StreamError> {
        if handle.direction() == Direction::Rx {
            return Err(StreamError::NotSupported);
        }
        let (hw, ctx) = self.parts(handle)?;
        // None waits without a deadline
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if let Some(front) = ctx.responses.front() {
                if !front.has_time() {
                    break;
                }
                let clock = TimeConverter::new(hw.sample_rate(Direction::Tx));
                let now = hw.timestamp(Direction::Tx).map_err(|e| {
                    tracing::error!("bladerf_get_timestamp() returned {}", e);
                    StreamError::StreamError
                })?;
                if front.time_ns <= clock.ticks_to_ns(now) {
                    break;
                }
            }

            let nap = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(StreamError::Timeout);
                    }
                    remaining.min(STATUS_POLL_INTERVAL)
                }
                None => STATUS_POLL_INTERVAL,
            };
            std::thread::sleep(nap);
        }

        ctx.responses.pop().ok_or(StreamError::Timeout)
    }
}
