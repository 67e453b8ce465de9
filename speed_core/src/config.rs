//! Session configuration: everything needed to build a pipeline for one video.
//!
//! Loaded from JSON. Filter and estimator settings default sensibly; the
//! rectangle size and the frame rate have no default and must be given,
//! either here or by the caller (CLI flags, a detection log).

use crate::{
    calibrator::PlaneCalibrator,
    error::{require_positive, ConfigurationError, Result},
    pipeline::{PipelineConfig, SpeedPipeline},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the four calibration corners
    #[serde(default)]
    pub region_path: Option<PathBuf>,
    /// Rectangle width in ground units
    #[serde(default)]
    pub real_width: Option<f64>,
    /// Rectangle length in ground units
    #[serde(default)]
    pub real_length: Option<f64>,
    /// Frames per second of the source video
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl SessionConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigurationError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        tracing::info!(path = %path.display(), "session configuration loaded");
        Ok(config)
    }

    /// Check the values that are present. Absent sizes and frame rate are
    /// reported when something needs them.
    pub fn validate(&self) -> Result<()> {
        let present = [
            ("real width", self.real_width),
            ("real length", self.real_length),
            ("frame rate", self.fps),
        ];
        for (name, value) in present {
            if let Some(value) = value {
                require_positive(name, value)?;
            }
        }
        self.pipeline.estimator.validate()
    }

    /// Real width and length of the calibration rectangle.
    pub fn dimensions(&self) -> Result<(f64, f64)> {
        let width = self.real_width.ok_or(ConfigurationError::Missing("real width"))?;
        let length = self
            .real_length
            .ok_or(ConfigurationError::Missing("real length"))?;
        Ok((
            require_positive("real width", width)?,
            require_positive("real length", length)?,
        ))
    }

    pub fn frame_rate(&self) -> Result<f64> {
        let fps = self.fps.ok_or(ConfigurationError::Missing("frame rate"))?;
        require_positive("frame rate", fps)
    }

    /// Pipeline settings for a source running at `fps`.
    pub fn pipeline_config(&self, fps: f64) -> PipelineConfig {
        let mut config = self.pipeline.clone();
        config.estimator.fps = fps;
        config
    }

    /// Build a pipeline from a calibrator built elsewhere, at the session's frame rate.
    pub fn build_pipeline(&self, calibrator: PlaneCalibrator) -> Result<SpeedPipeline> {
        self.validate()?;
        SpeedPipeline::new(self.pipeline_config(self.frame_rate()?), calibrator)
    }

    /// Calibrate from `region_path`. `None` if the session names no region file.
    pub fn load_calibrator(&self) -> Option<Result<PlaneCalibrator>> {
        self.region_path.as_deref().map(|path| {
            let (width, length) = self.dimensions()?;
            PlaneCalibrator::from_region_file(path, width, length)
        })
    }
}
