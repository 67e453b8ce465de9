//! Camera detection simulator.
//!
//! Generates one `FrameDetections` per video frame with:
//! - Projection of each vehicle's ground position through the inverse homography
//! - Uniform pixel jitter on the anchor point
//! - Miss probability (1 - P_D)
//! - Occasional boxes the tracker has not assigned an id to yet
//!
//! Only vehicles inside the calibrated rectangle are seen.

use crate::vehicle::Vehicle;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use speed_core::types::{BoundingBox, Detection, FrameDetections, FrameIndex, PixelPoint, TrackId};
use speed_core::PlaneCalibrator;

/// Detector/tracker behaviour of the simulated camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    /// Frames per second
    pub fps: f64,
    /// Half-width of the uniform anchor noise (pixels)
    pub jitter_px: f64,
    /// Probability a visible vehicle is detected in a frame
    pub p_detection: f64,
    /// Probability a detection carries no tracker id
    pub p_untracked: f64,
    /// Detector confidence is drawn uniformly from this range
    pub confidence: (f32, f32),
    /// Bounding box size (pixels)
    pub box_size: [f64; 2],
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fps: 30.0,
            jitter_px: 0.5,
            p_detection: 0.98,
            p_untracked: 0.01,
            confidence: (0.55, 0.95),
            box_size: [120.0, 90.0],
        }
    }
}

/// Turns true vehicle states into per-frame detections.
pub struct CameraSimulator {
    pub params: CameraParams,
    calibrator: PlaneCalibrator,
    rng: ChaCha8Rng,
}

impl CameraSimulator {
    pub fn new(params: CameraParams, calibrator: PlaneCalibrator, seed: u64) -> Self {
        Self {
            params,
            calibrator,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Detections for the vehicles visible at time `t`, in vehicle order.
    pub fn capture(
        &mut self,
        frame_index: FrameIndex,
        t: f64,
        vehicles: &[Vehicle],
    ) -> FrameDetections {
        let ground = *self.calibrator.ground();
        let mut detections = Vec::new();

        for vehicle in vehicles {
            if !vehicle.is_visible(t) {
                continue;
            }
            let [x, y] = vehicle.position;
            if !ground.contains(x, y) {
                continue;
            }

            // Miss detection?
            if self.rng.gen::<f64>() > self.params.p_detection {
                continue;
            }

            let exact = self.calibrator.project_to_image(x, y);
            let j = self.params.jitter_px;
            let anchor = PixelPoint::new(
                exact.x + self.rng.gen::<f64>() * j * 2.0 - j,
                exact.y + self.rng.gen::<f64>() * j * 2.0 - j,
            );

            let (lo, hi) = self.params.confidence;
            let confidence = if hi > lo { self.rng.gen_range(lo..hi) } else { lo };

            let track_id = if self.rng.gen::<f64>() < self.params.p_untracked {
                None
            } else {
                Some(TrackId(vehicle.id))
            };

            let [w, h] = self.params.box_size;
            detections.push(Detection {
                bbox: BoundingBox::from_anchor(anchor, w, h),
                class_id: vehicle.class_id,
                confidence,
                track_id,
            });
        }

        FrameDetections {
            frame_index,
            detections,
        }
    }

    pub fn calibrator(&self) -> &PlaneCalibrator {
        &self.calibrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speed_core::region::CalibrationRegion;
    use std::f64::consts::FRAC_PI_2;

    fn calibrator() -> PlaneCalibrator {
        let region = CalibrationRegion::from_pairs(&[
            [812.0, 305.0],
            [1108.0, 305.0],
            [1690.0, 1010.0],
            [236.0, 1010.0],
        ])
        .unwrap();
        PlaneCalibrator::new(region, 730.0, 5000.0).unwrap()
    }

    fn exact_camera() -> CameraParams {
        CameraParams {
            jitter_px: 0.0,
            p_detection: 1.0,
            p_untracked: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn anchor_maps_back_to_true_position() {
        let cal = calibrator();
        let mut cam = CameraSimulator::new(exact_camera(), cal.clone(), 1);
        let vehicles = vec![Vehicle::cruising(7, [365.0, 2500.0], FRAC_PI_2, 50.0)];
        let frame = cam.capture(3, 0.1, &vehicles);
        assert_eq!(frame.frame_index, 3);
        assert_eq!(frame.detections.len(), 1);

        let det = &frame.detections[0];
        assert_eq!(det.track_id, Some(TrackId(7)));
        let g = cal.map_point(det.anchor());
        assert!((g.x - 365).abs() <= 1 && (g.y - 2500).abs() <= 1, "{g:?}");
    }

    #[test]
    fn vehicles_outside_the_rectangle_are_not_seen() {
        let mut cam = CameraSimulator::new(exact_camera(), calibrator(), 1);
        let vehicles = vec![
            Vehicle::cruising(1, [365.0, -10.0], FRAC_PI_2, 50.0),
            Vehicle::cruising(2, [365.0, 5001.0], FRAC_PI_2, 50.0),
            Vehicle::cruising(3, [800.0, 100.0], FRAC_PI_2, 50.0),
        ];
        assert!(cam.capture(0, 0.0, &vehicles).detections.is_empty());
    }

    #[test]
    fn occluded_and_missed_vehicles_are_dropped() {
        let mut blind = CameraSimulator::new(
            CameraParams {
                p_detection: 0.0,
                ..exact_camera()
            },
            calibrator(),
            1,
        );
        let mut v = Vehicle::cruising(1, [365.0, 100.0], FRAC_PI_2, 50.0);
        assert!(blind.capture(0, 0.0, &[v.clone()]).detections.is_empty());

        v.occlusions = vec![(0.0, 1.0)];
        let mut cam = CameraSimulator::new(exact_camera(), calibrator(), 1);
        assert!(cam.capture(0, 0.5, &[v.clone()]).detections.is_empty());
        assert_eq!(cam.capture(1, 1.0, &[v]).detections.len(), 1);
    }

    #[test]
    fn same_seed_same_detections() {
        let vehicles: Vec<_> = (0..20)
            .map(|i| Vehicle::cruising(i, [100.0 + i as f64 * 25.0, 200.0 * i as f64], FRAC_PI_2, 60.0))
            .collect();
        let run = |seed| {
            let mut cam = CameraSimulator::new(CameraParams::default(), calibrator(), seed);
            (0..5).map(|f| cam.capture(f, f as f64 / 30.0, &vehicles)).collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }
}
