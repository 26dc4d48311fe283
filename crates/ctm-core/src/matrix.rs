//! Row-major 3x3 color transform matrix.

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::codec::{self, WireMatrix};
use crate::error::Result;

/// A 3x3 color transform applied to linear RGB, stored row-major.
///
/// The output red channel is `m[0] * r + m[1] * g + m[2] * b`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix([f64; 9]);

impl Matrix {
    pub const IDENTITY: Self = Self([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    pub const ZERO: Self = Self([0.0; 9]);

    /// Create a matrix from nine row-major coefficients.
    pub const fn new(coefficients: [f64; 9]) -> Self {
        Self(coefficients)
    }

    /// Create a matrix from three rows.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        let [r0, r1, r2] = rows;
        Self([
            r0[0], r0[1], r0[2], r1[0], r1[1], r1[2], r2[0], r2[1], r2[2],
        ])
    }

    /// Saturation adjustment.
    ///
    /// Every entry gets `(1 - s) / 3` and the diagonal additionally gets `s`.
    /// `s = 0` averages the channels to gray, `s = 1` is the identity and
    /// values above one boost saturation.
    pub fn saturation(s: f64) -> Self {
        let base = (1.0 - s) / 3.0;
        let mut m = [base; 9];
        for i in [0, 4, 8] {
            m[i] += s;
        }
        Self(m)
    }

    pub fn coefficients(&self) -> &[f64; 9] {
        &self.0
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0[row * 3 + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.0[row * 3 + col] = value;
    }

    pub fn rows(&self) -> [[f64; 3]; 3] {
        let m = &self.0;
        [[m[0], m[1], m[2]], [m[3], m[4], m[5]], [m[6], m[7], m[8]]]
    }

    /// Largest absolute coefficient.
    pub fn max_abs(&self) -> f64 {
        self.0.iter().fold(0.0, |acc: f64, c| acc.max(c.abs()))
    }

    /// Whether every coefficient is within `epsilon` of `other`'s.
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    /// Convert to glam. glam stores columns, so the row-major array is
    /// loaded as columns and transposed.
    pub fn to_dmat3(&self) -> DMat3 {
        DMat3::from_cols_array(&self.0).transpose()
    }

    pub fn from_dmat3(m: DMat3) -> Self {
        Self(m.transpose().to_cols_array())
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &Self) -> Self {
        Self::from_dmat3(self.to_dmat3() * first.to_dmat3())
    }

    /// Transform one RGB triplet.
    pub fn apply_rgb(&self, rgb: [f64; 3]) -> [f64; 3] {
        self.to_dmat3().mul_vec3(DVec3::from_array(rgb)).to_array()
    }

    /// Encode, saturating out-of-range coefficients.
    pub fn encode(&self) -> WireMatrix {
        codec::encode(self)
    }

    /// Encode, rejecting coefficients the wire format cannot carry.
    pub fn try_encode(&self) -> Result<WireMatrix> {
        codec::try_encode(self)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[[f64; 3]; 3]> for Matrix {
    fn from(rows: [[f64; 3]; 3]) -> Self {
        Self::from_rows(rows)
    }
}
