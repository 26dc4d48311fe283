//! Error types for the control engine.

use std::fmt;
use std::io;

use thiserror::Error;

/// Failures of the one-shot payload transfer.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Fewer bytes than a full matrix were available. A usage error.
    #[error("ctm payload too short: expected {expected} bytes, got {got}")]
    Short { expected: usize, got: usize },

    #[error("failed to set payload handle non-blocking: {0}")]
    Nonblocking(#[source] io::Error),

    #[error("failed to read ctm payload: {0}")]
    Io(#[source] io::Error),
}

/// Fatal usage errors posted to the offending connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("the ctm payload doesn't have the right amount of data: expected {expected} bytes, got {got}")]
    InvalidCtm { expected: usize, got: usize },
}

impl ProtocolError {
    /// Wire code of [`ProtocolError::InvalidCtm`].
    pub const INVALID_CTM: u32 = 0;

    /// Stable error code for the transport.
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidCtm { .. } => Self::INVALID_CTM,
        }
    }
}

/// Why a control object sent `failed`.
///
/// The client only ever sees the bare event; the reason is for the
/// compositor's own logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The request named no output, or one already removed.
    NoOutput,
    /// The manager was shut down before the request arrived.
    ManagerGone,
    /// A newer control took over the same output.
    Evicted,
    /// The payload handle could not be read.
    Io,
    /// The output refused the transform.
    Rejected,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoOutput => "no output",
            Self::ManagerGone => "manager gone",
            Self::Evicted => "evicted",
            Self::Io => "payload i/o failure",
            Self::Rejected => "rejected by output",
        };
        f.write_str(s)
    }
}
