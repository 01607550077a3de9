//! Error types for brf-sync operations.

use thiserror::Error;

/// Result type for brf-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes matching libbladeRF `BLADERF_ERR_*` values (for cross-compatibility).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    /// An unexpected failure occurred.
    Unexpected = -1,
    /// Provided parameter is out of range.
    Range = -2,
    /// Invalid operation/parameter.
    Inval = -3,
    /// Memory allocation error.
    Mem = -4,
    /// File/device I/O error.
    Io = -5,
    /// Operation timed out.
    Timeout = -6,
    /// No device(s) available.
    NoDev = -7,
    /// Operation not supported.
    Unsupported = -8,
    /// Misaligned flash access.
    Misaligned = -9,
    /// Invalid checksum.
    Checksum = -10,
    /// File not found.
    NoFile = -11,
    /// An FPGA update is required.
    UpdateFpga = -12,
    /// A firmware update is required.
    UpdateFw = -13,
    /// Requested timestamp is in the past.
    TimePast = -14,
    /// Could not enqueue data into full queue.
    QueueFull = -15,
    /// An FPGA operation reported failure.
    FpgaOp = -16,
    /// Insufficient permissions for the requested operation.
    Permission = -17,
    /// Operation would block, but has been requested to be non-blocking.
    WouldBlock = -18,
    /// Device insufficiently initialized for operation.
    NotInit = -19,
}

impl ErrorCode {
    /// Get a human-readable name for the error code.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Unexpected => "BLADERF_ERR_UNEXPECTED",
            ErrorCode::Range => "BLADERF_ERR_RANGE",
            ErrorCode::Inval => "BLADERF_ERR_INVAL",
            ErrorCode::Mem => "BLADERF_ERR_MEM",
            ErrorCode::Io => "BLADERF_ERR_IO",
            ErrorCode::Timeout => "BLADERF_ERR_TIMEOUT",
            ErrorCode::NoDev => "BLADERF_ERR_NODEV",
            ErrorCode::Unsupported => "BLADERF_ERR_UNSUPPORTED",
            ErrorCode::Misaligned => "BLADERF_ERR_MISALIGNED",
            ErrorCode::Checksum => "BLADERF_ERR_CHECKSUM",
            ErrorCode::NoFile => "BLADERF_ERR_NO_FILE",
            ErrorCode::UpdateFpga => "BLADERF_ERR_UPDATE_FPGA",
            ErrorCode::UpdateFw => "BLADERF_ERR_UPDATE_FW",
            ErrorCode::TimePast => "BLADERF_ERR_TIME_PAST",
            ErrorCode::QueueFull => "BLADERF_ERR_QUEUE_FULL",
            ErrorCode::FpgaOp => "BLADERF_ERR_FPGA_OP",
            ErrorCode::Permission => "BLADERF_ERR_PERMISSION",
            ErrorCode::WouldBlock => "BLADERF_ERR_WOULD_BLOCK",
            ErrorCode::NotInit => "BLADERF_ERR_NOT_INIT",
        }
    }

    /// Look up the code for a raw libbladeRF return value.
    ///
    /// Unknown negative values map to [`ErrorCode::Unexpected`]; zero and
    /// positive values are not errors and return `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        let code = match code {
            0.. => return None,
            -2 => ErrorCode::Range,
            -3 => ErrorCode::Inval,
            -4 => ErrorCode::Mem,
            -5 => ErrorCode::Io,
            -6 => ErrorCode::Timeout,
            -7 => ErrorCode::NoDev,
            -8 => ErrorCode::Unsupported,
            -9 => ErrorCode::Misaligned,
            -10 => ErrorCode::Checksum,
            -11 => ErrorCode::NoFile,
            -12 => ErrorCode::UpdateFpga,
            -13 => ErrorCode::UpdateFw,
            -14 => ErrorCode::TimePast,
            -15 => ErrorCode::QueueFull,
            -16 => ErrorCode::FpgaOp,
            -17 => ErrorCode::Permission,
            -18 => ErrorCode::WouldBlock,
            -19 => ErrorCode::NotInit,
            _ => ErrorCode::Unexpected,
        };
        Some(code)
    }
}

/// Errors that can occur during synchronous transfer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The transfer did not complete within the supplied timeout.
    #[error("Transfer timed out")]
    Timeout,

    /// The requested timestamp has already passed on the hardware clock.
    #[error("Requested timestamp is in the past")]
    TimePast,

    /// Invalid operation or parameter.
    #[error("Invalid operation: {0}")]
    Invalid(String),

    /// Operation not supported by the device.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Any other driver failure, identified by its libbladeRF code.
    #[error("Device error: {}", .0.name())]
    Device(ErrorCode),
}

impl Error {
    /// The libbladeRF error code equivalent to this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Timeout => ErrorCode::Timeout,
            Error::TimePast => ErrorCode::TimePast,
            Error::Invalid(_) => ErrorCode::Inval,
            Error::Unsupported(_) => ErrorCode::Unsupported,
            Error::Device(code) => *code,
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Timeout => Error::Timeout,
            ErrorCode::TimePast => Error::TimePast,
            other => Error::Device(other),
        }
    }
}
