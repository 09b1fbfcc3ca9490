//! Configuration management for HudWarp
//!
//! Resolutions and grid sizes are read once at startup and then passed by
//! reference to every component. Nothing here is global.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Largest supported matrix count
pub const MAX_MATRIX_COUNT: u32 = 32;

/// A width/height pair, in pixels or in grid vertices depending on the field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub x: u32,
    pub y: u32,
}

impl Resolution {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn as_f64(&self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }

    /// Number of cells (or pixels) covered
    pub fn area(&self) -> usize {
        self.x as usize * self.y as usize
    }
}

/// Display and warping grid parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WarpingConfig {
    /// Number of calibrated grids (e.g. upper, middle and lower eye height)
    pub matrix_count: u32,

    /// Physical display resolution in pixels
    pub display: Resolution,

    /// Vertices of a calibrated input grid
    pub input_grid: Resolution,

    /// Vertices of the extrapolated grid uploaded to the GPU
    pub extrapolated_grid: Resolution,

    /// Content area in pixels, centered on the display
    pub content: Resolution,
}

impl Default for WarpingConfig {
    fn default() -> Self {
        Self {
            display: Resolution::new(100, 100),
            input_grid: Resolution::new(10, 10),
            extrapolated_grid: Resolution::new(12, 12),
            content: Resolution::new(80, 80),
            matrix_count: 3,
        }
    }
}

impl WarpingConfig {
    /// Check the invariants the numeric core relies on but never re-checks.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (name, res) in [
            ("display", self.display),
            ("input grid", self.input_grid),
            ("extrapolated grid", self.extrapolated_grid),
            ("content", self.content),
        ] {
            if res.x == 0 || res.y == 0 {
                return Err(ConfigError::ZeroResolution {
                    name,
                    x: res.x,
                    y: res.y,
                });
            }
        }

        let g = self.input_grid;
        let e = self.extrapolated_grid;

        if g.x < 2 || g.y < 2 {
            return Err(ConfigError::InputGridTooSmall { x: g.x, y: g.y });
        }
        if e.x < g.x || e.y < g.y {
            return Err(ConfigError::ExtrapolatedTooSmall {
                ex: e.x,
                ey: e.y,
                gx: g.x,
                gy: g.y,
            });
        }

        let (dx, dy) = (e.x - g.x, e.y - g.y);
        if dx % 2 != 0 || dy % 2 != 0 {
            return Err(ConfigError::OddPadding { dx, dy });
        }

        if self.matrix_count < 2 || self.matrix_count > MAX_MATRIX_COUNT {
            return Err(ConfigError::MatrixCount {
                count: self.matrix_count,
                max: MAX_MATRIX_COUNT,
            });
        }

        let texture_x = e.x.checked_mul(2);
        let texture_y = e.y.checked_mul(self.matrix_count);
        if texture_x.is_none() || texture_y.is_none() {
            return Err(ConfigError::TextureTooLarge {
                ex: e.x,
                ey: e.y,
                count: self.matrix_count,
            });
        }

        Ok(())
    }

    /// Number of f32 values in one calibrated input grid
    pub fn input_value_count(&self) -> usize {
        self.input_grid.area() * 2
    }

    /// Logical texture size in texels: two texels per cell, one grid row band per matrix.
    ///
    /// Saturates at `u32::MAX`, which [`Self::validate`] rules out.
    pub fn texture_size(&self) -> Resolution {
        Resolution::new(
            self.extrapolated_grid.x.saturating_mul(2),
            self.extrapolated_grid.y.saturating_mul(self.matrix_count),
        )
    }

    /// Byte length of the encoded texture
    pub fn texture_byte_len(&self) -> usize {
        self.extrapolated_grid.area() * 2 * self.matrix_count as usize * 4
    }

    /// Vertices needed to draw the extrapolated grid as triangle pairs
    pub fn vertex_count(&self) -> usize {
        let e = self.extrapolated_grid;
        e.x.saturating_sub(1) as usize * e.y.saturating_sub(1) as usize * 6
    }

    /// Load configuration from a file, or create default if it doesn't exist.
    ///
    /// `.json` files are read as the legacy flat constants document and are
    /// never created; a missing one falls back to defaults.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let is_legacy = path.extension().is_some_and(|ext| ext == "json");

        let config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: WarpingConfig = if is_legacy {
                serde_json::from_str::<LegacyConstants>(&content)
                    .with_context(|| format!("Failed to parse warping constants from {:?}", path))?
                    .into()
            } else {
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config from {:?}", path))?
            };
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else if is_legacy {
            tracing::warn!(
                "Could not open warping constants file {:?}, using default values",
                path
            );
            WarpingConfig::default()
        } else {
            let config = WarpingConfig::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            config
        };

        config
            .validate()
            .with_context(|| format!("Invalid warping configuration in {:?}", path))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

/// Flat constants document as shipped on existing head units
#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LegacyConstants {
    display_resolution_x: u32,
    display_resolution_y: u32,
    warping_matrix_input_resolution_x: u32,
    warping_matrix_input_resolution_y: u32,
    warping_matrix_count: u32,
    content_resolution_x: u32,
    content_resolution_y: u32,
    warping_matrix_extrapolated_resolution_x: u32,
    warping_matrix_extrapolated_resolution_y: u32,
}

impl From<LegacyConstants> for WarpingConfig {
    fn from(c: LegacyConstants) -> Self {
        Self {
            display: Resolution::new(c.display_resolution_x, c.display_resolution_y),
            input_grid: Resolution::new(
                c.warping_matrix_input_resolution_x,
                c.warping_matrix_input_resolution_y,
            ),
            extrapolated_grid: Resolution::new(
                c.warping_matrix_extrapolated_resolution_x,
                c.warping_matrix_extrapolated_resolution_y,
            ),
            content: Resolution::new(c.content_resolution_x, c.content_resolution_y),
            matrix_count: c.warping_matrix_count,
        }
    }
}
