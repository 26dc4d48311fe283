//! Fixed-point wire codec for color transform matrices.
//!
//! Each of the nine coefficients travels as one 64-bit word: bit 63 is the
//! sign, bits 0..63 hold the magnitude in 32.32 fixed point. This is
//! sign-magnitude, not two's complement, so a magnitude of 2^63 or more
//! would land on the sign bit. `encode` saturates such magnitudes to
//! `MAGNITUDE_MASK`; `try_encode` rejects them.
//!
//! Words are laid out in native byte order: the payload is shared memory
//! between processes on the same machine.

use bytemuck::{Pod, Zeroable};

use crate::error::{CtmError, Result};
use crate::matrix::Matrix;

/// Sign flag of an encoded coefficient.
pub const SIGN_BIT: u64 = 1 << 63;

/// Bits available to the fixed-point magnitude.
pub const MAGNITUDE_MASK: u64 = !SIGN_BIT;

/// Fractional bits of the 32.32 magnitude.
pub const FRACTION_BITS: u32 = 32;

/// Coefficients must stay strictly below this magnitude to encode losslessly.
pub const MAX_COEFFICIENT: f64 = 2_147_483_648.0; // 2^31

/// Number of 64-bit words in a wire matrix.
pub const WIRE_WORDS: usize = 9;

/// Number of 32-bit words in the transport framing.
pub const WIRE_WORDS32: usize = WIRE_WORDS * 2;

/// Exact payload size in bytes.
pub const WIRE_SIZE: usize = WIRE_WORDS * std::mem::size_of::<u64>();

const SCALE: f64 = (1u64 << FRACTION_BITS) as f64;

/// A matrix in its on-wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct WireMatrix([u64; WIRE_WORDS]);

impl WireMatrix {
    /// Wrap nine already-encoded words.
    pub const fn from_words(words: [u64; WIRE_WORDS]) -> Self {
        Self(words)
    }

    /// The encoded words, row-major.
    pub fn words(&self) -> &[u64; WIRE_WORDS] {
        &self.0
    }

    /// The same payload viewed as the 18 32-bit words of the transport.
    pub fn as_words32(&self) -> &[u32] {
        bytemuck::cast_slice(&self.0)
    }

    /// Raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Copy the payload into a fixed-size buffer.
    pub fn to_bytes(&self) -> [u8; WIRE_SIZE] {
        let mut out = [0u8; WIRE_SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Reinterpret a received payload. The buffer need not be aligned.
    pub fn from_bytes(bytes: &[u8; WIRE_SIZE]) -> Self {
        bytemuck::pod_read_unaligned(bytes)
    }

    /// Decode back to floating point.
    pub fn decode(&self) -> Matrix {
        decode(self)
    }
}

/// Encode a single coefficient.
///
/// NaN encodes as zero and magnitudes that do not fit in 63 bits saturate,
/// so the sign bit is never clobbered.
pub fn encode_coefficient(value: f64) -> u64 {
    if value.is_nan() {
        return 0;
    }
    let magnitude = (value.abs() * SCALE).round();
    let bits = if magnitude >= MAGNITUDE_MASK as f64 {
        MAGNITUDE_MASK
    } else {
        magnitude as u64
    };
    if value < 0.0 {
        bits | SIGN_BIT
    } else {
        bits
    }
}

/// Decode a single coefficient.
pub fn decode_coefficient(word: u64) -> f64 {
    let magnitude = (word & MAGNITUDE_MASK) as f64 / SCALE;
    if word & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Encode a matrix, saturating out-of-range coefficients.
pub fn encode(matrix: &Matrix) -> WireMatrix {
    let mut words = [0u64; WIRE_WORDS];
    for (word, &c) in words.iter_mut().zip(matrix.coefficients()) {
        *word = encode_coefficient(c);
    }
    WireMatrix(words)
}

/// Encode a matrix, rejecting coefficients the wire format cannot carry.
pub fn try_encode(matrix: &Matrix) -> Result<WireMatrix> {
    for (index, &value) in matrix.coefficients().iter().enumerate() {
        if !value.is_finite() {
            return Err(CtmError::NonFinite { index });
        }
        if value.abs() >= MAX_COEFFICIENT {
            return Err(CtmError::OutOfRange { index, value });
        }
    }
    Ok(encode(matrix))
}

/// Decode a wire matrix.
pub fn decode(wire: &WireMatrix) -> Matrix {
    let mut coefficients = [0.0; WIRE_WORDS];
    for (c, &word) in coefficients.iter_mut().zip(wire.words()) {
        *c = decode_coefficient(word);
    }
    Matrix::new(coefficients)
}
