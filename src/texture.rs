//! Grid collection and GPU texture encoding
//!
//! Displacements are quantized to unsigned 32-bit fixed point and written
//! little-endian, so one component fills one RGBA8 texel and a grid cell
//! takes two texels.

use crate::matrix::Matrix;

/// Accepted displacement range is [-RANGE, RANGE]
const DISPLACEMENT_RANGE: f64 = 2.0;

/// Bytes per encoded component
pub const BYTES_PER_VALUE: usize = 4;

/// Quantize one displacement value.
///
/// Values outside [-2.0, 2.0] are clamped to the nearest end.
#[inline]
pub fn quantize(value: f64) -> u32 {
    let d = (value / (2.0 * DISPLACEMENT_RANGE) + 0.5).clamp(0.0, 1.0);
    (d * u32::MAX as f64).round() as u32
}

/// Ordered set of equally sized warping grids
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixTextureModel {
    dim_x: u32,
    dim_y: u32,
    matrices: Vec<Matrix>,
}

impl MatrixTextureModel {
    /// `matrix_count` zeroed grids of `dim_x` x `dim_y`
    pub fn new(matrix_count: u32, dim_x: u32, dim_y: u32) -> Self {
        Self {
            dim_x,
            dim_y,
            matrices: (0..matrix_count).map(|_| Matrix::new(dim_x, dim_y)).collect(),
        }
    }

    pub fn matrix(&self, index: usize) -> Option<&Matrix> {
        self.matrices.get(index)
    }

    pub fn matrices(&self) -> &[Matrix] {
        &self.matrices
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Replace grid `index`.
    ///
    /// Returns false and leaves the collection unchanged when the index is
    /// out of range or the dimensions differ.
    pub fn set_matrix(&mut self, index: usize, matrix: Matrix) -> bool {
        if !matrix.has_dims(self.dim_x, self.dim_y) {
            return false;
        }
        match self.matrices.get_mut(index) {
            Some(slot) => {
                *slot = matrix;
                true
            }
            None => false,
        }
    }

    /// Replace every grid.
    ///
    /// Returns false and leaves the collection unchanged if any grid has
    /// different dimensions.
    pub fn set_matrices(&mut self, matrices: Vec<Matrix>) -> bool {
        if matrices.iter().any(|m| !m.has_dims(self.dim_x, self.dim_y)) {
            return false;
        }
        self.matrices = matrices;
        true
    }

    /// Encoded length in bytes
    pub fn byte_len(&self) -> usize {
        self.matrices.len() * self.dim_x as usize * self.dim_y as usize * 2 * BYTES_PER_VALUE
    }

    /// Encode all grids, in order, into a fresh texture buffer.
    pub fn texture_data(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        for matrix in &self.matrices {
            for &value in matrix.data() {
                bytes.extend_from_slice(&quantize(value).to_le_bytes());
            }
        }
        bytes
    }
}
