//! Speed metrics: RMSE / mean absolute error against ground truth, coverage.

use crate::types::{DisplayLabel, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// True speed of one track at a given frame (from the simulator).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthSpeed {
    pub track_id: TrackId,
    pub speed_kmh: f64,
}

/// Accumulated metric statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpeedMetrics {
    /// Number of frames evaluated
    pub n_frames: u64,
    /// Labels emitted for tracks with a ground-truth speed
    pub n_labels: u64,
    /// Of those, labels carrying a speed
    pub n_with_speed: u64,
    /// Labels for ids absent from the ground truth
    pub n_unmatched: u64,
    /// Sum of squared speed errors (for RMSE)
    pub sum_sq_err: f64,
    /// Sum of absolute speed errors (for MAE)
    pub sum_abs_err: f64,
    /// Largest absolute error seen
    pub max_abs_err: f64,
}

impl SpeedMetrics {
    /// Root-mean-square speed error (km/h) over labels that carry a speed.
    pub fn rmse_kmh(&self) -> f64 {
        if self.n_with_speed == 0 {
            return 0.0;
        }
        (self.sum_sq_err / self.n_with_speed as f64).sqrt()
    }

    /// Mean absolute speed error (km/h).
    pub fn mean_abs_error_kmh(&self) -> f64 {
        if self.n_with_speed == 0 {
            return 0.0;
        }
        self.sum_abs_err / self.n_with_speed as f64
    }

    /// Fraction of matched labels that carry a speed (warm-up lowers it).
    pub fn coverage(&self) -> f64 {
        if self.n_labels == 0 {
            0.0
        } else {
            self.n_with_speed as f64 / self.n_labels as f64
        }
    }

    /// Accumulate one frame's worth of labels.
    pub fn accumulate(&mut self, labels: &[DisplayLabel], ground_truth: &[GroundTruthSpeed]) {
        self.n_frames += 1;

        let truth: HashMap<TrackId, f64> = ground_truth
            .iter()
            .map(|g| (g.track_id, g.speed_kmh))
            .collect();

        for label in labels {
            let Some(&true_kmh) = truth.get(&label.track_id) else {
                self.n_unmatched += 1;
                continue;
            };
            self.n_labels += 1;
            if let Some(kmh) = label.speed_kmh {
                let err = kmh - true_kmh;
                self.sum_sq_err += err * err;
                self.sum_abs_err += err.abs();
                self.max_abs_err = self.max_abs_err.max(err.abs());
                self.n_with_speed += 1;
            }
        }
    }
}
