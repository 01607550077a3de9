use std::time::Duration;

use brf_sync::{Direction, MetaFlags, MetaStatus, Metadata, SyncTransfer};

use super::{ReadInfo, StreamEngine, StreamHandle};
use crate::convert::HostSample;
use crate::error::StreamError;
use crate::flags::StreamFlags;
use crate::time::TimeConverter;

impl<H: SyncTransfer> StreamEngine<H> {
    /// Read samples from a receive stream, one buffer per channel.
    ///
    /// At most `min(buffer lengths, mtu)` sample periods are read. The
    /// stream must have been activated; without a pending command the call
    /// times out immediately. An overrun reported by the hardware surfaces
    /// as [`StreamError::Overflow`] on the following call.
    pub fn read_stream<T: HostSample>(
        &mut self,
        handle: &StreamHandle,
        bufs: &mut [&mut [T]],
        timeout: Duration,
    ) -> Result<ReadInfo, StreamError> {
        if handle.direction() != Direction::Rx {
            return Err(StreamError::NotSupported);
        }
        let (hw, ctx) = self.parts(handle)?;
        let lens: Vec<usize> = bufs.iter().map(|b| b.len()).collect();
        let mut count = ctx
            .check_call(T::FORMAT, &lens)?
            .min(ctx.buffer.capacity());

        let cmd = *ctx.commands.front().ok_or(StreamError::Timeout)?;
        let clock = TimeConverter::new(hw.sample_rate(Direction::Rx));

        if ctx.overflow_pending {
            ctx.overflow_pending = false;
            return Err(StreamError::Overflow {
                time_ns: clock.ticks_to_ns(ctx.next_ticks),
            });
        }

        let mut meta = Metadata {
            timestamp: clock.ns_to_ticks(cmd.time_ns),
            ..Default::default()
        };
        if !cmd.has_time() {
            meta.flags.insert(MetaFlags::RX_NOW);
        }
        if cmd.is_bounded() {
            count = count.min(cmd.num_elems);
        }
        // only the first transfer of a command is timed
        if let Some(front) = ctx.commands.front_mut() {
            front.flags = StreamFlags::empty();
        }

        let timeout = timeout.max(Self::rx_min_timeout(hw, ctx));
        let channels = ctx.channels.len();
        if let Err(err) = hw.sync_rx(
            ctx.buffer.as_bytes_mut(),
            count * channels,
            &mut meta,
            timeout,
        ) {
            let signal = StreamError::from_transfer("bladerf_sync_rx", &err);
            if signal == StreamError::StreamError && cmd.is_bounded() {
                ctx.commands.pop();
            }
            return Err(signal);
        }

        let produced = meta.actual_count / channels;
        ctx.buffer.read_into(bufs, produced);

        let mut flags = StreamFlags::HAS_TIME;
        if meta.status.contains(MetaStatus::OVERRUN) {
            tracing::info!("O");
            ctx.overflow_pending = true;
        }
        if meta.status.contains(MetaStatus::HW_MINIEXP1) {
            flags.insert(StreamFlags::USER_FLAG0);
        }
        if meta.status.contains(MetaStatus::HW_MINIEXP2) {
            flags.insert(StreamFlags::USER_FLAG1);
        }

        ctx.commands.consume(produced);
        ctx.next_ticks = meta.timestamp + produced as u64;

        Ok(ReadInfo {
            samples: produced,
            flags,
            time_ns: clock.ticks_to_ns(meta.timestamp),
        })
    }
}
