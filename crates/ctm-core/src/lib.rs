//! CTM Core - Color transform matrix types and wire codec
//!
//! This crate provides the pure data side of the color transform protocol:
//! - `Matrix`: a row-major 3x3 color transform in floating point
//! - `WireMatrix`: the fixed 72-byte sign-magnitude 32.32 wire layout
//! - The codec converting between the two
//!
//! Nothing in here performs I/O.

pub mod codec;
pub mod error;
pub mod matrix;

pub use codec::{
    decode, decode_coefficient, encode, encode_coefficient, try_encode, WireMatrix,
    FRACTION_BITS, MAGNITUDE_MASK, MAX_COEFFICIENT, SIGN_BIT, WIRE_SIZE, WIRE_WORDS,
    WIRE_WORDS32,
};
pub use error::{CtmError, Result};
pub use matrix::Matrix;
