//! Per-track state: position history, speed history, phase, last label.

use crate::{
    history::{PositionSample, SpeedHistory, TrackHistory},
    types::{DisplayLabel, FrameIndex, GroundPoint, TrackId},
};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a track.
///
/// `NEW` is transient: a track is created and immediately receives its first
/// sample, so it is observed as `WarmingUp` (or `Stable` at very low frame rates).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackPhase {
    /// Less than half a second of samples, no speed reported
    WarmingUp,
    /// Speed reported on every observation
    Stable,
}

/// Everything the estimator remembers about one tracker identifier.
///
/// Both histories live here so they are created, reset and dropped together.
#[derive(Clone, Debug)]
pub struct TrackState {
    pub id: TrackId,
    /// Mapped positions, capacity round(fps)
    pub positions: TrackHistory,
    /// Instantaneous speeds (km/h) feeding the rolling mean
    pub speeds: SpeedHistory,
    /// Frame of the first observation since creation (or last reset)
    pub first_seen: FrameIndex,
    /// Frame of the most recent observation
    pub last_seen: FrameIndex,
    /// Total observations since creation (or last reset)
    pub observations: u64,
    /// Last label handed out, reused when a speed update is skipped
    pub last_label: Option<DisplayLabel>,
}

impl TrackState {
    pub fn new(id: TrackId, frame: FrameIndex, history_len: usize, speed_window: usize) -> Self {
        Self {
            id,
            positions: TrackHistory::new(history_len),
            speeds: SpeedHistory::new(speed_window),
            first_seen: frame,
            last_seen: frame,
            observations: 0,
            last_label: None,
        }
    }

    /// Record one observation, evicting the oldest sample when full.
    pub fn push_sample(&mut self, frame: FrameIndex, position: GroundPoint) {
        self.positions.push(PositionSample { frame, position });
        self.last_seen = frame;
        self.observations += 1;
    }

    /// Forget everything, as if the id had never been seen before `frame`.
    pub fn reset(&mut self, frame: FrameIndex) {
        self.positions.clear();
        self.speeds.clear();
        self.first_seen = frame;
        self.last_seen = frame;
        self.observations = 0;
        self.last_label = None;
    }

    /// Warm-up gate: fewer than fps / 2 samples held.
    pub fn phase(&self, fps: f64) -> TrackPhase {
        if (self.positions.len() as f64) < fps / 2.0 {
            TrackPhase::WarmingUp
        } else {
            TrackPhase::Stable
        }
    }

    /// Rolling mean of the speed history (km/h).
    pub fn smoothed_speed(&self) -> Option<f64> {
        self.speeds.mean()
    }
}
