//! Detection logs: serialize/deserialize recorded frames for offline replay.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use speed_core::metrics::GroundTruthSpeed;
use speed_core::region::CalibrationRegion;
use speed_core::types::{FrameDetections, FrameIndex, TrackId};
use speed_core::PlaneCalibrator;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A full recorded session: calibration, frame rate and per-frame detections.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionLog {
    pub scenario_name: String,
    pub seed: u64,
    pub fps: f64,
    pub real_width: f64,
    pub real_length: f64,
    pub region: CalibrationRegion,
    /// All frames in order, including frames without detections
    pub frames: Vec<FrameDetections>,
    /// True vehicle speeds per frame (empty for real footage)
    #[serde(default)]
    pub ground_truth: Vec<GroundTruthFrame>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroundTruthFrame {
    pub frame_index: FrameIndex,
    pub vehicles: Vec<VehicleState>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleState {
    pub id: u64,
    /// Ground position (cm)
    pub position: [f64; 2],
    pub speed_kmh: f64,
}

impl GroundTruthFrame {
    pub fn speeds(&self) -> Vec<GroundTruthSpeed> {
        self.vehicles
            .iter()
            .map(|v| GroundTruthSpeed {
                track_id: TrackId(v.id),
                speed_kmh: v.speed_kmh,
            })
            .collect()
    }
}

impl DetectionLog {
    pub fn calibrator(&self) -> speed_core::Result<PlaneCalibrator> {
        PlaneCalibrator::new(self.region.clone(), self.real_width, self.real_length)
    }

    /// Ground truth for `frame_index`, if recorded.
    pub fn truth_at(&self, frame_index: FrameIndex) -> Option<&GroundTruthFrame> {
        self.ground_truth
            .binary_search_by_key(&frame_index, |g| g.frame_index)
            .ok()
            .map(|i| &self.ground_truth[i])
    }

    pub fn detection_count(&self) -> usize {
        self.frames.iter().map(|f| f.detections.len()).sum()
    }
}

/// Save a detection log to a JSON file.
pub fn save_log(log: &DetectionLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating detection log {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a detection log from a JSON file.
pub fn load_log(path: &Path) -> anyhow::Result<DetectionLog> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening detection log {}", path.display()))?;
    let reader = BufReader::new(file);
    let log: DetectionLog = serde_json::from_reader(reader)
        .with_context(|| format!("parsing detection log {}", path.display()))?;
    Ok(log)
}
