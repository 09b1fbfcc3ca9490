//! Calibration ingestion for a warped output
//!
//! Receives raw payloads from the diagnosis client (live head position,
//! per-index reference head position and calibrated grid), turns them into
//! extrapolated view-space grids and keeps everything the render path needs
//! for one frame.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Resolution, WarpingConfig};
use crate::error::{IngestError, SizeMismatch};
use crate::interpolation::{EyePosition, Interpolation, InterpolationModel};
use crate::matrix::Matrix;
use crate::texture::MatrixTextureModel;
use crate::transform::extend_warping_matrix;
use crate::uv::{uv_func, UvFunc};

/// Warped output shared between the calibration and render paths
pub type SharedWarpedOutput = Arc<RwLock<WarpedOutput>>;

/// Byte length of a head position payload (3 x f32)
pub const HEAD_POSITION_BYTES: usize = 3 * std::mem::size_of::<f32>();

/// Parse a native-endian `[f32; 3]` head position.
pub fn head_position_from_ne_bytes(bytes: &[u8]) -> Result<EyePosition, SizeMismatch> {
    if bytes.len() != HEAD_POSITION_BYTES {
        return Err(SizeMismatch {
            expected: HEAD_POSITION_BYTES,
            actual: bytes.len(),
        });
    }
    let v: Vec<f32> = bytemuck::pod_collect_to_vec(bytes);
    Ok(EyePosition::new(v[0].into(), v[1].into(), v[2].into()))
}

/// Uniforms for drawing one warped frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderParams {
    pub matrix_count: u32,
    pub matrix_resolution: [f32; 2],
    pub interpolation: Interpolation,
    pub uv_func: UvFunc,
}

/// Calibration state of one warped display
#[derive(Debug)]
pub struct WarpedOutput {
    config: WarpingConfig,
    interpolation_model: InterpolationModel,
    texture_model: MatrixTextureModel,
    /// Indices calibrated at least once
    initialized: Vec<bool>,
}

impl WarpedOutput {
    /// Empty output; `config` should have passed [`WarpingConfig::validate`].
    pub fn new(config: WarpingConfig) -> Self {
        let e = config.extrapolated_grid;
        Self {
            interpolation_model: InterpolationModel::new(config.matrix_count),
            texture_model: MatrixTextureModel::new(config.matrix_count, e.x, e.y),
            initialized: vec![false; config.matrix_count as usize],
            config,
        }
    }

    pub fn into_shared(self) -> SharedWarpedOutput {
        Arc::new(RwLock::new(self))
    }

    pub fn config(&self) -> &WarpingConfig {
        &self.config
    }

    /// Update the live head position from a raw payload.
    pub fn set_head_position(&mut self, bytes: &[u8]) -> Result<(), IngestError> {
        let position = head_position_from_ne_bytes(bytes).map_err(|e| {
            warn!("setting new head position failed: {}", e);
            IngestError::HeadPosition(e)
        })?;

        debug!(
            "setting new head position ({:.3}, {:.3}, {:.3})",
            position.x, position.y, position.z
        );
        self.interpolation_model.set_eye_position(position);
        Ok(())
    }

    /// Store the calibrated grid and reference head position for `index`.
    ///
    /// Both payloads are validated before anything is stored, so a rejected
    /// update leaves the previous calibration in place.
    pub fn set_warping_matrix(
        &mut self,
        index: u32,
        head_position: &[u8],
        matrix: &[u8],
    ) -> Result<(), IngestError> {
        let count = self.config.matrix_count;
        if index >= count {
            warn!(
                "setting new matrices failed: index {} out of bounds, matrix count {}",
                index, count
            );
            return Err(IngestError::IndexOutOfBounds { index, count });
        }

        let reference = head_position_from_ne_bytes(head_position).map_err(|e| {
            warn!("invalid size for head position: {}", e);
            IngestError::HeadPosition(e)
        })?;

        let g = self.config.input_grid;
        let calibrated = Matrix::from_ne_bytes(g.x, g.y, matrix).map_err(|e| {
            warn!("invalid size for warping matrix: {}", e);
            IngestError::WarpingMatrix(e)
        })?;

        self.apply_calibration(index, reference, &calibrated);
        Ok(())
    }

    /// Store an already parsed calibration for `index`.
    ///
    /// Out-of-range indices and wrongly sized grids are ignored.
    pub fn apply_calibration(&mut self, index: u32, reference: EyePosition, calibrated: &Matrix) {
        let g = self.config.input_grid;
        if index >= self.config.matrix_count || !calibrated.has_dims(g.x, g.y) {
            return;
        }

        info!("setting new warping matrix for index {}", index);

        let e = self.config.extrapolated_grid;
        let mut extended = Matrix::new(e.x, e.y);
        extend_warping_matrix(&self.config, calibrated, self.config.display.as_f64(), &mut extended);

        self.texture_model.set_matrix(index as usize, extended);
        self.interpolation_model
            .set_reference_eye_position(index as usize, reference);

        let was_initialized = self.is_initialized();
        self.initialized[index as usize] = true;

        if !self.is_initialized() {
            return;
        }
        if !was_initialized {
            info!("all warping matrices set, warped output is initialized");
        }
        if !self.interpolation_model.is_depth_ordered() {
            warn!(
                "reference eye positions are not ordered by decreasing depth after update of index {}, blending will be wrong",
                index
            );
        }
    }

    /// Whether every matrix index has been calibrated at least once
    pub fn is_initialized(&self) -> bool {
        self.initialized.iter().all(|&set| set)
    }

    /// Encoded texture once every grid is calibrated
    pub fn texture_data(&self) -> Option<Vec<u8>> {
        self.is_initialized().then(|| self.texture_model.texture_data())
    }

    /// Logical texture size in texels
    pub fn texture_size(&self) -> Resolution {
        self.config.texture_size()
    }

    pub fn texture_model(&self) -> &MatrixTextureModel {
        &self.texture_model
    }

    pub fn interpolation_model(&self) -> &InterpolationModel {
        &self.interpolation_model
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation_model.interpolation()
    }

    pub fn uv_func(&self) -> UvFunc {
        uv_func(&self.config)
    }

    /// Everything the shader needs for the current frame
    pub fn render_params(&self) -> RenderParams {
        let e = self.config.extrapolated_grid;
        RenderParams {
            matrix_count: self.config.matrix_count,
            matrix_resolution: [e.x as f32, e.y as f32],
            interpolation: self.interpolation(),
            uv_func: self.uv_func(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::quantize;

    fn config() -> WarpingConfig {
        WarpingConfig {
            display: Resolution::new(100, 100),
            input_grid: Resolution::new(3, 3),
            extrapolated_grid: Resolution::new(5, 5),
            content: Resolution::new(80, 80),
            matrix_count: 3,
        }
    }

    fn head_bytes(x: f32, y: f32, z: f32) -> Vec<u8> {
        [x, y, z].iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    /// Regular calibration grid over the content area
    fn matrix_bytes(config: &WarpingConfig) -> Vec<u8> {
        let g = config.input_grid;
        let mut values = Vec::new();
        for y in 0..g.y {
            for x in 0..g.x {
                values.push(10.0 + 40.0 * x as f32);
                values.push(10.0 + 40.0 * y as f32);
            }
        }
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    /// Log lines emitted while running `f`, without ANSI colors
    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = Arc::new(parking_lot::Mutex::new(Vec::<u8>::new()));
        let sink = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || LogSink(sink.clone()))
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = buffer.lock().clone();
        String::from_utf8(bytes).unwrap()
    }

    struct LogSink(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn count_order_warnings(logs: &str) -> usize {
        logs.lines()
            .filter(|l| l.contains("WARN") && l.contains("not ordered by decreasing depth"))
            .count()
    }

    fn calibrate_all(output: &mut WarpedOutput) {
        let m = matrix_bytes(output.config());
        for (i, depth) in [1.0, 0.5, 0.0].into_iter().enumerate() {
            output
                .set_warping_matrix(i as u32, &head_bytes(0.0, 0.0, depth), &m)
                .unwrap();
        }
    }

    #[test]
    fn test_head_position_parse() {
        let p = head_position_from_ne_bytes(&head_bytes(0.25, -1.5, 3.0)).unwrap();
        assert_eq!(p, EyePosition::new(0.25, -1.5, 3.0));

        let err = head_position_from_ne_bytes(&[0u8; 8]).unwrap_err();
        assert_eq!(err, SizeMismatch { expected: 12, actual: 8 });
    }

    #[test]
    fn test_initialization_requires_every_index() {
        let mut output = WarpedOutput::new(config());
        let m = matrix_bytes(output.config());

        assert!(!output.is_initialized());
        assert!(output.texture_data().is_none());

        output.set_warping_matrix(0, &head_bytes(0.0, 0.0, 1.0), &m).unwrap();
        output.set_warping_matrix(2, &head_bytes(0.0, 0.0, 0.0), &m).unwrap();
        assert!(!output.is_initialized());

        output.set_warping_matrix(1, &head_bytes(0.0, 0.0, 0.5), &m).unwrap();
        assert!(output.is_initialized());

        let data = output.texture_data().unwrap();
        assert_eq!(data.len(), config().texture_byte_len());
    }

    #[test]
    fn test_stored_grid_is_extrapolated_view_space() {
        let mut output = WarpedOutput::new(config());
        calibrate_all(&mut output);

        let grid = output.texture_model().matrix(1).unwrap();
        assert_eq!((grid.dim_x(), grid.dim_y()), (5, 5));
        // Calibrated vertex (0, 0) = pixel (10, 10)
        assert!((grid.get(1, 1, 0) + 0.79).abs() < 1e-6);
        assert!((grid.get(1, 1, 1) - 0.79).abs() < 1e-6);
        // Extrapolated ring continues the 0.8 step
        assert!((grid.get(0, 1, 0) + 1.59).abs() < 1e-6);

        let data = output.texture_data().unwrap();
        let first = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        assert_eq!(first, quantize(output.texture_model().matrix(0).unwrap().get(0, 0, 0)));
    }

    #[test]
    fn test_rejected_updates_keep_state() {
        let mut output = WarpedOutput::new(config());
        calibrate_all(&mut output);
        let snapshot = output.texture_model().clone();
        let refs = output.interpolation_model().reference_eye_positions().to_vec();

        let m = matrix_bytes(output.config());
        assert_eq!(
            output.set_warping_matrix(3, &head_bytes(0.0, 0.0, 9.0), &m),
            Err(IngestError::IndexOutOfBounds { index: 3, count: 3 })
        );
        assert!(matches!(
            output.set_warping_matrix(0, &head_bytes(0.0, 0.0, 9.0), &m[..m.len() - 4]),
            Err(IngestError::WarpingMatrix(_))
        ));
        assert!(matches!(
            output.set_warping_matrix(0, &[0u8; 4], &m),
            Err(IngestError::HeadPosition(_))
        ));

        assert_eq!(output.texture_model(), &snapshot);
        assert_eq!(output.interpolation_model().reference_eye_positions(), &refs[..]);
    }

    #[test]
    fn test_live_head_position_drives_interpolation() {
        let mut output = WarpedOutput::new(config());
        calibrate_all(&mut output);

        output.set_head_position(&head_bytes(0.0, 0.0, 0.75)).unwrap();
        let i = output.interpolation();
        assert_eq!(i.index, 0);
        assert!((i.factor - 0.5).abs() < 1e-6);

        assert!(output.set_head_position(&[1, 2, 3]).is_err());
        assert_eq!(output.interpolation(), i);

        output.set_head_position(&head_bytes(0.0, 0.0, -1.0)).unwrap();
        assert_eq!(output.interpolation(), Interpolation { index: 1, factor: 1.0 });
    }

    #[test]
    fn test_render_params() {
        let output = WarpedOutput::new(config());
        let params = output.render_params();
        assert_eq!(params.matrix_count, 3);
        assert_eq!(params.matrix_resolution, [5.0, 5.0]);
        assert_eq!(params.uv_func, uv_func(&config()));
        assert_eq!(output.texture_size(), Resolution::new(10, 15));
    }

    #[test]
    fn test_shared_access() {
        let shared = WarpedOutput::new(config()).into_shared();
        calibrate_all(&mut shared.write());
        assert!(shared.read().is_initialized());
    }

    #[test]
    fn test_unordered_set_warns_on_initialization() {
        let mut output = WarpedOutput::new(config());
        let m = matrix_bytes(output.config());

        let logs = captured_logs(|| {
            for (i, depth) in [0.0, 0.5, 1.0].into_iter().enumerate() {
                output
                    .set_warping_matrix(i as u32, &head_bytes(0.0, 0.0, depth), &m)
                    .unwrap();
            }
        });

        assert!(output.is_initialized());
        assert!(!output.interpolation_model().is_depth_ordered());
        assert_eq!(count_order_warnings(&logs), 1);
    }

    #[test]
    fn test_recalibration_out_of_order_warns() {
        let mut output = WarpedOutput::new(config());
        let logs = captured_logs(|| calibrate_all(&mut output));
        assert_eq!(count_order_warnings(&logs), 0);

        let m = matrix_bytes(output.config());
        let logs = captured_logs(|| {
            output
                .set_warping_matrix(1, &head_bytes(0.0, 0.0, 5.0), &m)
                .unwrap();
        });
        assert!(!output.interpolation_model().is_depth_ordered());
        assert_eq!(count_order_warnings(&logs), 1);

        // Restoring the order silences the warning again
        let logs = captured_logs(|| {
            output
                .set_warping_matrix(1, &head_bytes(0.0, 0.0, 0.5), &m)
                .unwrap();
        });
        assert_eq!(count_order_warnings(&logs), 0);
    }

    #[test]
    fn test_unvalidated_large_matrix_count() {
        let mut cfg = config();
        cfg.matrix_count = 40;
        let mut output = WarpedOutput::new(cfg);
        let m = matrix_bytes(output.config());

        for i in 0..39 {
            output
                .set_warping_matrix(i, &head_bytes(0.0, 0.0, 40.0 - i as f32), &m)
                .unwrap();
        }
        assert!(!output.is_initialized());

        output.set_warping_matrix(39, &head_bytes(0.0, 0.0, 0.0), &m).unwrap();
        assert!(output.is_initialized());
        assert_eq!(output.texture_data().unwrap().len(), output.config().texture_byte_len());
    }
}
