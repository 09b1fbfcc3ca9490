//! Error types for the calibration boundary
//!
//! The numeric core never fails: out-of-range access reads 0.0 and writes
//! are dropped. These types are only returned where external data enters the
//! crate (configuration files and calibration payloads).

use thiserror::Error;

/// A flat value stream did not have the length a grid needs.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("expected {expected} bytes, got {actual}")]
pub struct SizeMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Invalid warping configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} resolution must be positive, got {x}x{y}")]
    ZeroResolution { name: &'static str, x: u32, y: u32 },

    #[error("input grid needs at least 2x2 vertices, got {x}x{y}")]
    InputGridTooSmall { x: u32, y: u32 },

    #[error("extrapolated grid {ex}x{ey} is smaller than input grid {gx}x{gy}")]
    ExtrapolatedTooSmall { ex: u32, ey: u32, gx: u32, gy: u32 },

    #[error("extrapolation padding must be even, got {dx}x{dy}")]
    OddPadding { dx: u32, dy: u32 },

    #[error("matrix count must be between 2 and {max}, got {count}")]
    MatrixCount { count: u32, max: u32 },

    #[error("texture for {count} grids of {ex}x{ey} vertices exceeds u32 texel dimensions")]
    TextureTooLarge { ex: u32, ey: u32, count: u32 },
}

/// Rejected calibration update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("warping matrix index {index} out of bounds (matrix count {count})")]
    IndexOutOfBounds { index: u32, count: u32 },

    #[error("invalid head position: {0}")]
    HeadPosition(SizeMismatch),

    #[error("invalid warping matrix: {0}")]
    WarpingMatrix(SizeMismatch),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = IngestError::WarpingMatrix(SizeMismatch {
            expected: 800,
            actual: 12,
        });
        assert_eq!(
            err.to_string(),
            "invalid warping matrix: expected 800 bytes, got 12"
        );

        let err = ConfigError::MatrixCount { count: 1, max: 32 };
        assert_eq!(err.to_string(), "matrix count must be between 2 and 32, got 1");
    }
}
