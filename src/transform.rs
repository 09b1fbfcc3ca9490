//! Coordinate transformation and linear extrapolation of warping grids
//!
//! Calibrated grids arrive as pixel-middle coordinates on the physical
//! display. The GPU samples them in normalized view space and needs one or
//! more extra rings of vertices around the calibrated area, which are filled
//! by continuing the outermost known values linearly.

use crate::config::{Resolution, WarpingConfig};
use crate::matrix::{Matrix, COMPONENTS};

/// Maps display pixel indices to normalized view space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    w: f64,
    h: f64,
    /// Display to view width ratio
    wr: f64,
    /// Display to view height ratio
    hr: f64,
}

impl ViewTransform {
    /// Transform for a display rendered into a viewport of `view` pixels
    pub fn new(display: Resolution, view: [f64; 2]) -> Self {
        let [w, h] = display.as_f64();
        Self {
            w,
            h,
            wr: w / view[0],
            hr: h / view[1],
        }
    }

    /// Transform a pixel-middle coordinate to view space.
    ///
    /// X is kept, Y is flipped since display rows grow downwards.
    #[inline]
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let ss_x = (x * 2.0 - (self.w - 1.0)) / self.w;
        let ss_y = (y * -2.0 + (self.h - 1.0)) / self.h;

        ((ss_x + 1.0) * self.wr - 1.0, (ss_y - 1.0) * self.hr + 1.0)
    }

    /// Apply [`Self::transform_point`] to every cell of a grid
    pub fn transform_matrix(&self, input: &Matrix) -> Matrix {
        let mut out = Matrix::new(input.dim_x(), input.dim_y());
        for y in 0..input.dim_y() {
            for x in 0..input.dim_x() {
                let (vx, vy) = self.transform_point(input.get(x, y, 0), input.get(x, y, 1));
                out.set(x, y, 0, vx);
                out.set(x, y, 1, vy);
            }
        }
        out
    }
}

/// Build the extrapolated view-space grid for one calibrated input grid.
///
/// `input` must be `config.input_grid` sized and `target`
/// `config.extrapolated_grid` sized; otherwise `target` is left untouched.
pub fn extend_warping_matrix(
    config: &WarpingConfig,
    input: &Matrix,
    view: [f64; 2],
    target: &mut Matrix,
) {
    let g = config.input_grid;
    let e = config.extrapolated_grid;
    if !input.has_dims(g.x, g.y) || !target.has_dims(e.x, e.y) {
        return;
    }

    let view_space = ViewTransform::new(config.display, view).transform_matrix(input);
    extrapolate_linear(&view_space, target);
}

/// Center `inner` in `target` and fill the border by linear continuation.
///
/// Rows are extended first, then columns over the full target width so the
/// corners come out of the already extended rows. For linear extrapolation
/// the order does not change the corner values.
///
/// No-op unless `target` is at least as large as `inner` with an even
/// difference on both axes. An `inner` grid with zero rows or columns has no
/// edge to continue from and is a no-op as well.
pub fn extrapolate_linear(inner: &Matrix, target: &mut Matrix) {
    let (dim_x, dim_y) = (inner.dim_x(), inner.dim_y());
    let (t_dim_x, t_dim_y) = (target.dim_x(), target.dim_y());

    if dim_x == 0 || dim_y == 0 || t_dim_x < dim_x || t_dim_y < dim_y {
        return;
    }
    if (t_dim_x - dim_x) % 2 != 0 || (t_dim_y - dim_y) % 2 != 0 {
        return;
    }

    let x_offset = (t_dim_x - dim_x) / 2;
    let y_offset = (t_dim_y - dim_y) / 2;

    for y in 0..dim_y {
        for x in 0..dim_x {
            for c in 0..COMPONENTS {
                target.set(x + x_offset, y + y_offset, c, inner.get(x, y, c));
            }
        }
    }

    // Extrapolate in x-direction, innermost padding column first.
    let right_start = dim_x + x_offset - 1;
    for y in y_offset..(dim_y + y_offset) {
        for i in 0..x_offset {
            let left = x_offset - i;
            let right = right_start + i;
            for c in 0..COMPONENTS {
                let v = continue_linear(target.get(left, y, c), target.get(left + 1, y, c));
                target.set(left - 1, y, c, v);

                let v = continue_linear(target.get(right, y, c), target.get(right - 1, y, c));
                target.set(right + 1, y, c, v);
            }
        }
    }

    // Extrapolate in y-direction across the whole width, corners included.
    let bottom_start = dim_y + y_offset - 1;
    for i in 0..y_offset {
        let top = y_offset - i;
        let bottom = bottom_start + i;
        for x in 0..t_dim_x {
            for c in 0..COMPONENTS {
                let v = continue_linear(target.get(x, top, c), target.get(x, top + 1, c));
                target.set(x, top - 1, c, v);

                let v = continue_linear(target.get(x, bottom, c), target.get(x, bottom - 1, c));
                target.set(x, bottom + 1, c, v);
            }
        }
    }
}

/// Next value of the sequence `neighbor, edge, ...`
#[inline]
fn continue_linear(edge: f64, neighbor: f64) -> f64 {
    edge * 2.0 - neighbor
}
