//! Warping grid storage
//!
//! A [`Matrix`] is a dense grid of 2-component displacement vectors stored
//! row-major: y, then x, then component.

use crate::error::SizeMismatch;

/// Components per grid cell (horizontal, vertical)
pub const COMPONENTS: u32 = 2;

/// Dense warping grid with double-precision cells
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    dim_x: u32,
    dim_y: u32,
    elements: Vec<f64>,
}

impl Matrix {
    /// Zero-filled grid
    pub fn new(dim_x: u32, dim_y: u32) -> Self {
        Self {
            dim_x,
            dim_y,
            elements: vec![0.0; cell_value_count(dim_x, dim_y)],
        }
    }

    /// Grid populated from single-precision values in row-major order.
    ///
    /// Values past `dim_x * dim_y * 2` are ignored; a short slice leaves the
    /// remaining cells at 0.0.
    pub fn from_f32(dim_x: u32, dim_y: u32, values: &[f32]) -> Self {
        let mut matrix = Self::new(dim_x, dim_y);
        for (dst, &src) in matrix.elements.iter_mut().zip(values) {
            *dst = f64::from(src);
        }
        matrix
    }

    /// Parse a native-endian f32 stream as delivered by the calibration client.
    pub fn from_ne_bytes(dim_x: u32, dim_y: u32, bytes: &[u8]) -> Result<Self, SizeMismatch> {
        let expected = cell_value_count(dim_x, dim_y) * std::mem::size_of::<f32>();
        if bytes.len() != expected {
            return Err(SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let values: Vec<f32> = bytemuck::pod_collect_to_vec(bytes);
        Ok(Self::from_f32(dim_x, dim_y, &values))
    }

    /// Component `z` of cell (x, y), or 0.0 when out of range
    #[inline]
    pub fn get(&self, x: u32, y: u32, z: u32) -> f64 {
        match self.offset(x, y, z) {
            Some(i) => self.elements[i],
            None => 0.0,
        }
    }

    /// Set component `z` of cell (x, y). Out-of-range writes are dropped.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, z: u32, value: f64) {
        if let Some(i) = self.offset(x, y, z) {
            self.elements[i] = value;
        }
    }

    pub fn dim_x(&self) -> u32 {
        self.dim_x
    }

    pub fn dim_y(&self) -> u32 {
        self.dim_y
    }

    /// Whether this grid has the given dimensions
    pub fn has_dims(&self, dim_x: u32, dim_y: u32) -> bool {
        self.dim_x == dim_x && self.dim_y == dim_y
    }

    /// Backing storage in row-major order
    pub fn data(&self) -> &[f64] {
        &self.elements
    }

    #[inline]
    fn offset(&self, x: u32, y: u32, z: u32) -> Option<usize> {
        if x < self.dim_x && y < self.dim_y && z < COMPONENTS {
            Some(
                (y as usize * self.dim_x as usize + x as usize) * COMPONENTS as usize + z as usize,
            )
        } else {
            None
        }
    }
}

fn cell_value_count(dim_x: u32, dim_y: u32) -> usize {
    dim_x as usize * dim_y as usize * COMPONENTS as usize
}
