//! Error handling for the streaming engine
//!
//! Two kinds of failure are kept apart. [`Error`] is returned by stream setup
//! and teardown and means the stream could not be created or released.
//! [`StreamError`] is the per-call signal returned by reads, writes and
//! status polls; the stream stays usable after any of them.

use brf_sync::Direction;
use thiserror::Error;

/// A specialized Result type for setup and teardown
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal setup/teardown errors
#[derive(Debug, Error)]
pub enum Error {
    /// The `format` stream argument names no known wire format
    #[error("Invalid sample format: '{0}', valid formats: [sc16, sc16_meta, sc8, sc8_meta, sc16_packed]")]
    InvalidWireFormat(String),

    /// The host sample format is neither CF32 nor CS16
    #[error("setupStream invalid format '{0}' -- only CF32 and CS16 are supported")]
    InvalidHostFormat(String),

    /// Channel selection other than [0], [1] or [0, 1]
    #[error("setupStream invalid channel selection {0:?}")]
    InvalidChannels(Vec<usize>),

    /// The direction already has a live stream
    #[error("{0} stream already set up")]
    StreamBusy(Direction),

    /// The stream was set up but could not be activated
    #[error("activateStream failed: {0}")]
    Activation(#[source] StreamError),

    /// A driver call failed
    #[error("{context} failed: {source}")]
    Hardware {
        context: &'static str,
        #[source]
        source: brf_sync::Error,
    },
}

impl Error {
    pub(crate) fn hardware(context: &'static str, source: brf_sync::Error) -> Self {
        tracing::error!("{}() returned {}", context, source);
        Error::Hardware { context, source }
    }
}

/// Per-call stream signals, numbered like SoapySDR's `SOAPY_SDR_*` codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Nothing could be transferred before the timeout
    #[error("timeout")]
    Timeout,
    /// Unclassified hardware failure
    #[error("stream error")]
    StreamError,
    /// Receive-side overrun; `time_ns` is where the next samples start
    #[error("overflow at {time_ns} ns")]
    Overflow { time_ns: i64 },
    /// The operation is not available for this stream
    #[error("not supported")]
    NotSupported,
    /// The requested start time has already passed
    #[error("time error")]
    TimeError,
    /// Transmit-side underrun
    #[error("underflow")]
    Underflow,
}

impl StreamError {
    pub fn code(self) -> i32 {
        match self {
            StreamError::Timeout => -1,
            StreamError::StreamError => -2,
            StreamError::Overflow { .. } => -4,
            StreamError::NotSupported => -5,
            StreamError::TimeError => -6,
            StreamError::Underflow => -7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StreamError::Timeout => "TIMEOUT",
            StreamError::StreamError => "STREAM_ERROR",
            StreamError::Overflow { .. } => "OVERFLOW",
            StreamError::NotSupported => "NOT_SUPPORTED",
            StreamError::TimeError => "TIME_ERROR",
            StreamError::Underflow => "UNDERFLOW",
        }
    }

    /// Map a failed driver transfer to the signal returned to the caller.
    pub(crate) fn from_transfer(call: &str, err: &brf_sync::Error) -> Self {
        match err {
            brf_sync::Error::Timeout => StreamError::Timeout,
            brf_sync::Error::TimePast => StreamError::TimeError,
            other => {
                tracing::error!("{}() returned {}", call, other);
                StreamError::StreamError
            }
        }
    }
}
