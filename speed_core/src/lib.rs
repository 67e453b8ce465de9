//! `speed_core`: Ground-plane calibration and per-track speed estimation.
//!
//! # Module layout
//! - [`types`]: Fundamental types (ids, pixel/ground points, detections, labels)
//! - [`error`]: Calibration and configuration errors
//! - [`region`]: Calibration quadrilateral and real-world rectangle
//! - [`homography`]: 4-point perspective transform
//! - [`calibrator`]: PlaneCalibrator: pixel anchors → ground coordinates
//! - [`history`]: Bounded FIFO buffers
//! - [`track`]: Per-track state and phase
//! - [`retention`]: When idle tracks are dropped
//! - [`estimator`]: TrackSpeedEstimator: warm-up gate and two-stage smoothing
//! - [`pipeline`]: Per-frame orchestrator (filter, map, observe, sweep)
//! - [`config`]: Session configuration loaded from JSON
//! - [`metrics`]: RMSE / MAE / coverage against ground-truth speeds

pub mod calibrator;
pub mod config;
pub mod error;
pub mod estimator;
pub mod history;
pub mod homography;
pub mod metrics;
pub mod pipeline;
pub mod region;
pub mod retention;
pub mod track;
pub mod types;

pub use calibrator::PlaneCalibrator;
pub use config::SessionConfig;
pub use error::{CalibrationError, ConfigurationError, Error, Result};
pub use estimator::{EstimatorConfig, TrackSpeedEstimator};
pub use pipeline::{FrameOutput, LabeledDetection, PipelineConfig, SpeedPipeline};
pub use region::{CalibrationRegion, GroundRectangle};
pub use retention::RetentionPolicy;
pub use track::TrackPhase;
pub use types::{
    BoundingBox, Detection, DisplayLabel, FrameDetections, FrameIndex, GroundPoint, PixelPoint,
    TrackId,
};
