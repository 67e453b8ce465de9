//! Pipeline orchestrator: the full speed-estimation cycle for one frame.
//!
//! # Processing steps per frame
//! 1. Filter detections (tracker id present, class, confidence, zone)
//! 2. Compute bottom-center anchors and map them to the ground plane (parallel)
//! 3. Observe each (track id, ground point, frame) in input order
//! 4. Sweep tracks idle past the retention window
//! 5. Collect labels, counters and timings

use crate::{
    calibrator::PlaneCalibrator,
    estimator::{EstimatorConfig, TrackSpeedEstimator},
    error::Result,
    types::{DisplayLabel, FrameDetections, FrameIndex, GroundPoint, PixelPoint, TrackId},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for the per-frame pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Speed estimator settings (fps, smoothing window, units, retention)
    pub estimator: EstimatorConfig,
    /// Keep only these detector classes. `None` keeps everything.
    pub class_filter: Option<Vec<u32>>,
    /// Drop detections below this confidence
    pub min_confidence: f32,
    /// Drop detections whose anchor lies outside the calibration region
    pub restrict_to_region: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            // COCO: person, bicycle, car, motorcycle, bus, truck
            class_filter: Some(vec![0, 1, 2, 3, 5, 7]),
            min_confidence: 0.5,
            restrict_to_region: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One accepted detection and the label to draw at its anchor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledDetection {
    pub track_id: TrackId,
    pub class_id: u32,
    /// Bottom-center of the bounding box (pixels)
    pub anchor: PixelPoint,
    /// Anchor on the ground plane (ground units)
    pub ground: GroundPoint,
    pub label: DisplayLabel,
}

/// Outputs of one pipeline step.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FrameOutput {
    pub frame_index: FrameIndex,
    /// Labels in detection order
    pub labels: Vec<LabeledDetection>,
    /// Detections dropped by the filters
    pub filtered: usize,
    /// Track ids seen for the first time (or after eviction) this frame
    pub new_tracks: usize,
    /// Tracks evicted by the idle sweep this frame
    pub evicted: usize,
    /// Tracks held by the estimator after this frame
    pub live_tracks: usize,
    /// Timings in microseconds
    pub timing_map_us: u64,
    pub timing_estimate_us: u64,
    pub total_time_us: u64,
}

impl FrameOutput {
    /// Label strings in detection order, ready for the annotator.
    pub fn label_strings(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.label.to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The speed-estimation pipeline. Holds the calibration and the track states.
pub struct SpeedPipeline {
    pub config: PipelineConfig,
    calibrator: PlaneCalibrator,
    estimator: TrackSpeedEstimator,
    frames_processed: u64,
}

impl SpeedPipeline {
    pub fn new(config: PipelineConfig, calibrator: PlaneCalibrator) -> Result<Self> {
        let estimator = TrackSpeedEstimator::new(config.estimator.clone())?;
        Ok(Self {
            config,
            calibrator,
            estimator,
            frames_processed: 0,
        })
    }

    /// Process one frame of detections. Returns full pipeline output.
    pub fn process_frame(&mut self, frame: &FrameDetections) -> FrameOutput {
        let start_total = Instant::now();
        let frame_index = frame.frame_index;

        // ----------------------------------------------------------------
        // Step 1: Filter
        // ----------------------------------------------------------------
        let accepted: Vec<(TrackId, u32, PixelPoint)> = frame
            .detections
            .iter()
            .filter_map(|d| {
                let track_id = d.track_id?;
                if d.confidence < self.config.min_confidence {
                    return None;
                }
                if let Some(classes) = &self.config.class_filter {
                    if !classes.contains(&d.class_id) {
                        return None;
                    }
                }
                let anchor = d.anchor();
                if self.config.restrict_to_region && !self.calibrator.region().contains(anchor) {
                    return None;
                }
                Some((track_id, d.class_id, anchor))
            })
            .collect();
        let filtered = frame.detections.len() - accepted.len();

        // ----------------------------------------------------------------
        // Step 2: Map anchors to the ground plane (Parallel)
        // ----------------------------------------------------------------
        let t0 = Instant::now();
        let calibrator = &self.calibrator;
        let ground: Vec<GroundPoint> = accepted
            .par_iter()
            .map(|&(_, _, anchor)| calibrator.map_point(anchor))
            .collect();
        let timing_map_us = t0.elapsed().as_micros() as u64;

        // ----------------------------------------------------------------
        // Step 3: Observe, in detection order
        // ----------------------------------------------------------------
        let t0 = Instant::now();
        let mut new_tracks = 0;
        let mut labels = Vec::with_capacity(accepted.len());
        for (&(track_id, class_id, anchor), &ground) in accepted.iter().zip(ground.iter()) {
            if !self.estimator.is_live(track_id, frame_index) {
                new_tracks += 1;
            }
            let label = self.estimator.observe(track_id, ground, frame_index);
            labels.push(LabeledDetection {
                track_id,
                class_id,
                anchor,
                ground,
                label,
            });
        }
        let timing_estimate_us = t0.elapsed().as_micros() as u64;

        // ----------------------------------------------------------------
        // Step 4: Sweep idle tracks
        // ----------------------------------------------------------------
        let evicted = self.estimator.sweep(frame_index);
        self.frames_processed += 1;

        tracing::debug!(
            frame = frame_index,
            detections = frame.detections.len(),
            labelled = labels.len(),
            filtered,
            new_tracks,
            evicted,
            "frame processed"
        );

        FrameOutput {
            frame_index,
            labels,
            filtered,
            new_tracks,
            evicted,
            live_tracks: self.estimator.len(),
            timing_map_us,
            timing_estimate_us,
            total_time_us: start_total.elapsed().as_micros() as u64,
        }
    }

    pub fn calibrator(&self) -> &PlaneCalibrator {
        &self.calibrator
    }

    pub fn estimator(&self) -> &TrackSpeedEstimator {
        &self.estimator
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Reset: clear all tracks.
    pub fn reset(&mut self) {
        self.estimator.reset();
        self.frames_processed = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
