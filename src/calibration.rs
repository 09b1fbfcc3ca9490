//! Calibration documents exported by the diagnosis tooling

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::IngestError;
use crate::ingest::WarpedOutput;

/// One calibrated grid with the eye position it was measured from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridCalibration {
    pub index: u32,
    pub reference_eye_position: [f32; 3],
    /// Pixel-middle coordinates, row-major (y, x, component)
    pub values: Vec<f32>,
}

/// A full calibration set, optionally with a live head position
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_position: Option<[f32; 3]>,
    #[serde(default)]
    pub grids: Vec<GridCalibration>,
}

impl CalibrationDocument {
    /// Load a JSON calibration document
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read calibration from {:?}", path))?;
        let doc: CalibrationDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse calibration from {:?}", path))?;
        tracing::info!(
            "Loaded {} calibrated grids from {:?}",
            doc.grids.len(),
            path
        );
        Ok(doc)
    }

    /// Feed the document through the same byte interface the live client uses.
    pub fn apply(&self, output: &mut WarpedOutput) -> Result<(), IngestError> {
        for grid in &self.grids {
            output.set_warping_matrix(
                grid.index,
                &to_ne_bytes(&grid.reference_eye_position),
                &to_ne_bytes(&grid.values),
            )?;
        }
        if let Some(head) = &self.head_position {
            output.set_head_position(&to_ne_bytes(head))?;
        }
        Ok(())
    }
}

fn to_ne_bytes(values: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}
