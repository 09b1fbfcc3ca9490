//! Eye-position based blending between calibrated grids
//!
//! Every calibrated grid comes with the eye position it was measured from.
//! The live eye depth selects two neighbouring grids and a blend factor:
//! `grid[index] * (1 - factor) + grid[index + 1] * factor`.

use nalgebra::Vector3;
use serde::Serialize;

/// Eye position in the vehicle frame, meters
pub type EyePosition = Vector3<f64>;

/// Component used for the lookup (depth)
const INTERPOLATION_COORDINATE: usize = 2;

/// Blend parameters handed to the shader
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Interpolation {
    pub index: u32,
    pub factor: f32,
}

/// Live and reference eye positions
#[derive(Debug, Clone)]
pub struct InterpolationModel {
    eye_position: EyePosition,
    reference_eye_positions: Vec<EyePosition>,
}

impl InterpolationModel {
    pub fn new(matrix_count: u32) -> Self {
        Self {
            eye_position: EyePosition::zeros(),
            reference_eye_positions: vec![EyePosition::zeros(); matrix_count as usize],
        }
    }

    /// Replace the live eye position
    pub fn set_eye_position(&mut self, eye_position: EyePosition) {
        self.eye_position = eye_position;
    }

    pub fn eye_position(&self) -> &EyePosition {
        &self.eye_position
    }

    /// Replace the reference position of grid `index`.
    ///
    /// Returns false and keeps the previous value when `index` is out of range.
    pub fn set_reference_eye_position(&mut self, index: usize, position: EyePosition) -> bool {
        match self.reference_eye_positions.get_mut(index) {
            Some(slot) => {
                *slot = position;
                true
            }
            None => false,
        }
    }

    pub fn reference_eye_positions(&self) -> &[EyePosition] {
        &self.reference_eye_positions
    }

    /// Whether reference depths are non-increasing in index order.
    ///
    /// [`Self::interpolation`] assumes they are; callers own that ordering.
    pub fn is_depth_ordered(&self) -> bool {
        self.reference_eye_positions
            .windows(2)
            .all(|w| w[0][INTERPOLATION_COORDINATE] >= w[1][INTERPOLATION_COORDINATE])
    }

    /// Blend index and factor for the current live eye position.
    ///
    /// The index is clamped to `[0, count - 2]` so the shader never reads a
    /// grid past either end. With fewer than two grids there is nothing to
    /// blend and `(0, 0.0)` is returned.
    pub fn interpolation(&self) -> Interpolation {
        let refs = &self.reference_eye_positions;
        let count = refs.len();
        if count < 2 {
            return Interpolation::default();
        }

        let depth = |i: usize| refs[i][INTERPOLATION_COORDINATE];
        let p = self.eye_position[INTERPOLATION_COORDINATE];

        if p >= depth(0) {
            return Interpolation {
                index: 0,
                factor: 0.0,
            };
        }
        if p <= depth(count - 1) {
            return Interpolation {
                index: (count - 2) as u32,
                factor: 1.0,
            };
        }

        match (1..count).find(|&i| p >= depth(i)) {
            Some(i) => {
                let h = depth(i - 1);
                let l = depth(i);
                Interpolation {
                    index: (i - 1) as u32,
                    factor: ((h - p) / (h - l)) as f32,
                }
            }
            // Unreachable for ordered references; the last grid is the safe answer.
            None => Interpolation {
                index: (count - 2) as u32,
                factor: 1.0,
            },
        }
    }
}
