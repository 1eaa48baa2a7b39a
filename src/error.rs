//! Decode errors.
//!
//! The primary decode API reports failure as absence (`None`); these types
//! carry the reason for callers that use the `try_*` entry points, and for
//! the `debug!` log line emitted when a failure is turned into absence.

use libwebp_sys::VP8StatusCode;
use thiserror::Error;

use crate::limits::LimitExceeded;

/// Result type alias using `At<DecodeError>` for location tracking.
///
/// Errors wrapped in `At<>` capture the file and line where they were
/// raised, which is usually more useful than the libwebp status alone.
pub type DecodeResult<T> = core::result::Result<T, whereat::At<DecodeError>>;

/// Status reported by libwebp for a probe, decode or append call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DecodeStatus {
    Ok,
    OutOfMemory,
    InvalidParam,
    BitstreamError,
    UnsupportedFeature,
    /// The incremental decoder needs more data.
    Suspended,
    UserAbort,
    NotEnoughData,
}

impl DecodeStatus {
    /// Whether an incremental decode may continue after this status.
    #[inline]
    pub const fn is_resumable(self) -> bool {
        matches!(self, Self::Ok | Self::Suspended)
    }
}

impl From<VP8StatusCode> for DecodeStatus {
    fn from(status: VP8StatusCode) -> Self {
        match status {
            VP8StatusCode::VP8_STATUS_OK => Self::Ok,
            VP8StatusCode::VP8_STATUS_OUT_OF_MEMORY => Self::OutOfMemory,
            VP8StatusCode::VP8_STATUS_INVALID_PARAM => Self::InvalidParam,
            VP8StatusCode::VP8_STATUS_BITSTREAM_ERROR => Self::BitstreamError,
            VP8StatusCode::VP8_STATUS_UNSUPPORTED_FEATURE => Self::UnsupportedFeature,
            VP8StatusCode::VP8_STATUS_SUSPENDED => Self::Suspended,
            VP8StatusCode::VP8_STATUS_USER_ABORT => Self::UserAbort,
            VP8StatusCode::VP8_STATUS_NOT_ENOUGH_DATA => Self::NotEnoughData,
            #[allow(unreachable_patterns)]
            _ => Self::BitstreamError,
        }
    }
}

impl core::fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::OutOfMemory => "out of memory",
            Self::InvalidParam => "invalid parameter",
            Self::BitstreamError => "bitstream error",
            Self::UnsupportedFeature => "unsupported feature",
            Self::Suspended => "suspended",
            Self::UserAbort => "user abort",
            Self::NotEnoughData => "not enough data",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while probing or decoding a WebP image.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The input is too short to contain a usable header, or the probed
    /// dimensions are zero.
    #[error("insufficient data for a WebP header")]
    InsufficientData,

    /// libwebp returned a non-OK status.
    #[error("libwebp status: {0}")]
    Status(DecodeStatus),

    /// The decode descriptor is not usable for the probed image.
    #[error("invalid decode descriptor: {0}")]
    InvalidDescriptor(String),

    /// A configured resource limit was exceeded.
    #[error("resource limit exceeded: {0}")]
    LimitExceeded(#[from] LimitExceeded),

    /// The scratch buffer could not be allocated.
    #[error("failed to allocate {0} bytes of scratch memory")]
    OutOfMemory(usize),

    /// Reading the input stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decoding was cancelled via an [`enough::Stop`] token.
    #[error("decoding cancelled: {0}")]
    Cancelled(enough::StopReason),
}

impl From<enough::StopReason> for DecodeError {
    fn from(reason: enough::StopReason) -> Self {
        Self::Cancelled(reason)
    }
}

impl From<DecodeStatus> for DecodeError {
    fn from(status: DecodeStatus) -> Self {
        match status {
            DecodeStatus::NotEnoughData => Self::InsufficientData,
            other => Self::Status(other),
        }
    }
}
