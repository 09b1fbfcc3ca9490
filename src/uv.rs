//! Texture coordinate mapping for the warping shader
//!
//! The shader draws the extrapolated grid as a unit quad and computes
//! `texCoord = quadTexCoord * (ax, ay) + (cx, cy)` to sample the captured
//! display image. The mapping places the calibrated vertices over the
//! content area, centered on the display, with one extra grid cell of
//! margin for the extrapolated ring.

use nalgebra::Vector2;
use serde::Serialize;

use crate::config::{Resolution, WarpingConfig};

/// Affine texture coordinate transform `(ax, ay, cx, cy)`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct UvFunc {
    pub ax: f32,
    pub ay: f32,
    pub cx: f32,
    pub cy: f32,
}

impl UvFunc {
    pub fn to_array(self) -> [f32; 4] {
        [self.ax, self.ay, self.cx, self.cy]
    }

    /// Sample coordinate for a quad texture coordinate
    pub fn apply(&self, u: f32, v: f32) -> (f32, f32) {
        (u * self.ax + self.cx, v * self.ay + self.cy)
    }
}

/// UV transform for a configuration
pub fn uv_func(config: &WarpingConfig) -> UvFunc {
    compute_uv_func(
        config.display,
        config.content,
        config.input_grid,
        config.extrapolated_grid,
    )
}

/// UV transform from the individual resolutions
pub fn compute_uv_func(
    display: Resolution,
    content: Resolution,
    input_grid: Resolution,
    extrapolated_grid: Resolution,
) -> UvFunc {
    let display_res = Vector2::from(display.as_f64());
    let content_res = Vector2::from(content.as_f64());
    let cell_divisions = Vector2::new(input_grid.x as f64 - 1.0, input_grid.y as f64 - 1.0);
    let cell_size = content_res.component_div(&cell_divisions);

    // First vertex of the extrapolated ring, one cell outside the content area
    let first_vertex = (display_res - content_res) / 2.0 - cell_size;

    let c0 = pixel_middle_texcoord(&display_res, &first_vertex);
    let c1 = pixel_middle_texcoord(&display_res, &(first_vertex + cell_size));

    let extrapolated_steps = Vector2::new(
        extrapolated_grid.x as f64 - 1.0,
        extrapolated_grid.y as f64 - 1.0,
    );
    let a = (c1 - c0).component_mul(&extrapolated_steps);

    UvFunc {
        ax: a.x as f32,
        ay: a.y as f32,
        cx: c0.x as f32,
        cy: c0.y as f32,
    }
}

/// Texture coordinate of a pixel's middle; the upper left pixel corner is (0, 0)
/// and the lower right one (1, 1).
#[inline]
fn pixel_middle_texcoord(display_res: &Vector2<f64>, pixel: &Vector2<f64>) -> Vector2<f64> {
    (pixel + Vector2::repeat(0.5)).component_div(display_res)
}
