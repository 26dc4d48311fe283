//! Error types for matrix encoding.

use thiserror::Error;

/// Errors raised by the checked encoding path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CtmError {
    #[error("coefficient {index} is not finite")]
    NonFinite { index: usize },

    #[error("coefficient {index} ({value}) does not fit in 31 integer bits")]
    OutOfRange { index: usize, value: f64 },
}

/// Result type alias for CTM operations.
pub type Result<T> = std::result::Result<T, CtmError>;
