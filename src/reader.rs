//! Receive adapters
//!
//! [`RxSamples`] turns an activated receive stream into a blocking
//! iterator of sample chunks. [`AsyncRxSamples`] runs the same loop on a
//! dedicated thread and exposes the chunks as a [`futures::Stream`].

use std::time::Duration;

use brf_sync::{Direction, SyncTransfer};
use futures::Stream;

use crate::args::StreamArgs;
use crate::convert::HostSample;
use crate::error::{self, StreamError};
use crate::flags::StreamFlags;
use crate::stream::{StreamEngine, StreamHandle};

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Samples from one successful read, or an overflow marker.
#[derive(Debug, Clone, PartialEq)]
pub struct RxChunk<T> {
    /// One vector per channel; empty when `overflow` is set
    pub samples: Vec<Vec<T>>,
    pub time_ns: i64,
    pub flags: StreamFlags,
    /// Samples were dropped before `time_ns`
    pub overflow: bool,
}

impl<T> RxChunk<T> {
    pub fn len(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/**
 * Synchronous receive iterator
 */
pub struct RxSamples<'a, H: SyncTransfer, T> {
    engine: &'a mut StreamEngine<H>,
    handle: &'a StreamHandle,
    bufs: Vec<Vec<T>>,
    timeout: Duration,
    max_timeouts: usize,
}

impl<'a, H: SyncTransfer, T: HostSample> RxSamples<'a, H, T> {
    /// Iterate over an activated receive stream.
    ///
    /// Iteration ends once the stream has no pending command, so a bounded
    /// activation yields exactly its sample count.
    pub fn new(engine: &'a mut StreamEngine<H>, handle: &'a StreamHandle) -> Self {
        let mtu = engine.mtu(handle);
        let channels = engine.channels(handle).len();
        Self {
            engine,
            handle,
            bufs: vec![vec![T::default(); mtu]; channels],
            timeout: DEFAULT_READ_TIMEOUT,
            max_timeouts: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry up to `retries` timed-out reads before reporting a timeout.
    pub fn with_max_timeouts(mut self, retries: usize) -> Self {
        self.max_timeouts = retries;
        self
    }
}

impl<H: SyncTransfer, T: HostSample> Iterator for RxSamples<'_, H, T> {
    type Item = Result<RxChunk<T>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut timeouts = 0;
        loop {
            if self.engine.pending_commands(self.handle) == 0 {
                return None;
            }

            let mut refs: Vec<&mut [T]> = self.bufs.iter_mut().map(Vec::as_mut_slice).collect();
            match self.engine.read_stream(self.handle, &mut refs, self.timeout) {
                Ok(info) => {
                    let samples = self
                        .bufs
                        .iter()
                        .map(|b| b[..info.samples].to_vec())
                        .collect();
                    return Some(Ok(RxChunk {
                        samples,
                        time_ns: info.time_ns,
                        flags: info.flags,
                        overflow: false,
                    }));
                }
                Err(StreamError::Overflow { time_ns }) => {
                    return Some(Ok(RxChunk {
                        samples: vec![Vec::new(); self.bufs.len()],
                        time_ns,
                        flags: StreamFlags::HAS_TIME,
                        overflow: true,
                    }));
                }
                Err(StreamError::Timeout) if timeouts < self.max_timeouts => {
                    timeouts += 1;
                    tracing::trace!("read timeout {}/{}", timeouts, self.max_timeouts);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Receive activation for [`AsyncRxSamples`].
#[derive(Debug, Clone)]
pub struct AsyncRxConfig {
    pub channels: Vec<usize>,
    pub args: StreamArgs,
    /// `HAS_TIME` to start at `time_ns`
    pub flags: StreamFlags,
    pub time_ns: i64,
    /// 0 for continuous
    pub num_elems: usize,
    pub timeout: Duration,
}

impl Default for AsyncRxConfig {
    fn default() -> Self {
        Self {
            channels: vec![0],
            args: StreamArgs::new(),
            flags: StreamFlags::empty(),
            time_ns: 0,
            num_elems: 0,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/**
 * Asynchronous receive stream
 */
pub struct AsyncRxSamples<T> {
    rx: tokio::sync::mpsc::Receiver<Result<RxChunk<T>, StreamError>>,
    _handle: std::thread::JoinHandle<()>,
}

impl<T: HostSample> AsyncRxSamples<T> {
    /// Move `engine` to a reader thread and stream from a new receive stream.
    ///
    /// Setup and activation errors are returned here. The stream is closed
    /// when the bounded activation completes, a hardware error other than
    /// a timeout occurs, or the `AsyncRxSamples` is dropped.
    pub fn new<H>(engine: StreamEngine<H>, config: AsyncRxConfig) -> error::Result<Self>
    where
        H: SyncTransfer + Send + 'static,
    {
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<RxChunk<T>, StreamError>>(32);
        let (tx_init, rx_init) = std::sync::mpsc::channel::<error::Result<()>>();

        let handle = std::thread::spawn(move || {
            let mut engine = engine;
            let stream = match engine.setup_stream(
                Direction::Rx,
                T::FORMAT.name(),
                &config.channels,
                &config.args,
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = tx_init.send(Err(e));
                    return;
                }
            };
            if let Err(e) =
                engine.activate_stream(&stream, config.flags, config.time_ns, config.num_elems)
            {
                tracing::error!("activate_stream failed: {}", e);
                let _ = engine.close_stream(stream);
                let _ = tx_init.send(Err(error::Error::Activation(e)));
                return;
            }
            let _ = tx_init.send(Ok(()));

            let reader =
                RxSamples::<H, T>::new(&mut engine, &stream).with_timeout(config.timeout);
            for item in reader {
                let fatal = matches!(item, Err(e) if e != StreamError::Timeout);
                if tx.blocking_send(item).is_err() || fatal {
                    break;
                }
            }

            if let Err(e) = engine.close_stream(stream) {
                tracing::debug!("Failed to close RX stream: {}", e);
            }
        });

        match rx_init.recv() {
            Ok(Ok(())) => Ok(Self {
                rx,
                _handle: handle,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(error::Error::hardware(
                "reader thread",
                brf_sync::Error::Device(brf_sync::ErrorCode::Unexpected),
            )),
        }
    }
}

impl<T> Stream for AsyncRxSamples<T> {
    type Item = Result<RxChunk<T>, StreamError>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brf_sync::{MetaStatus, SimTransceiver};
    use num_complex::Complex;

    #[test]
    fn test_bounded_capture_ends_iteration() {
        let mut engine = StreamEngine::new(SimTransceiver::new());
        let args: StreamArgs = "buflen=1024".parse().unwrap();
        let rx = engine
            .setup_stream(Direction::Rx, "CF32", &[0], &args)
            .unwrap();
        engine
            .activate_stream(&rx, StreamFlags::empty(), 0, 2500)
            .unwrap();

        let chunks: Vec<_> = RxSamples::<_, Complex<f32>>::new(&mut engine, &rx)
            .collect::<Result<_, _>>()
            .unwrap();
        let lens: Vec<_> = chunks.iter().map(RxChunk::len).collect();
        assert_eq!(lens, [1024, 1024, 452]);
        assert_eq!(chunks[1].time_ns, 1_024_000);
    }

    #[test]
    fn test_overflow_is_an_item() {
        let mut engine = StreamEngine::new(SimTransceiver::new());
        let args: StreamArgs = "buflen=1024".parse().unwrap();
        let rx = engine
            .setup_stream(Direction::Rx, "CS16", &[0], &args)
            .unwrap();
        engine
            .hardware_mut()
            .push_status(Direction::Rx, MetaStatus::OVERRUN);
        engine
            .activate_stream(&rx, StreamFlags::empty(), 0, 0)
            .unwrap();

        let mut reader = RxSamples::<_, Complex<i16>>::new(&mut engine, &rx);
        let first = reader.next().unwrap().unwrap();
        assert!(!first.overflow);
        let marker = reader.next().unwrap().unwrap();
        assert!(marker.overflow);
        assert!(marker.is_empty());
        assert_eq!(marker.time_ns, 1_024_000);
        let next = reader.next().unwrap().unwrap();
        assert_eq!(next.time_ns, 1_024_000);
    }

    #[test]
    fn test_timeouts_are_retried() {
        let mut engine = StreamEngine::new(SimTransceiver::new());
        let rx = engine
            .setup_stream(Direction::Rx, "CS16", &[0], &StreamArgs::new())
            .unwrap();
        engine
            .activate_stream(&rx, StreamFlags::empty(), 0, 0)
            .unwrap();
        for _ in 0..3 {
            engine
                .hardware_mut()
                .push_fault(Direction::Rx, brf_sync::Error::Timeout);
        }

        let mut reader =
            RxSamples::<_, Complex<i16>>::new(&mut engine, &rx).with_max_timeouts(2);
        assert_eq!(reader.next(), Some(Err(StreamError::Timeout)));
        assert!(reader.next().unwrap().is_ok());
    }
}
