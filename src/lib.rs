//! HudWarp - warping grids for augmented-reality head-up displays
//!
//! Calibrated warping grids are converted from display pixels to view
//! space, extrapolated to cover the whole display, blended by viewer eye
//! depth and packed into a texture for the warping shader.

pub mod calibration;
pub mod config;
pub mod error;
pub mod ingest;
pub mod interpolation;
pub mod matrix;
pub mod texture;
pub mod transform;
pub mod uv;

pub use config::{Resolution, WarpingConfig};
pub use error::{ConfigError, IngestError, SizeMismatch};
pub use ingest::{SharedWarpedOutput, WarpedOutput};
pub use interpolation::{EyePosition, Interpolation, InterpolationModel};
pub use matrix::Matrix;
pub use texture::MatrixTextureModel;
pub use uv::UvFunc;
