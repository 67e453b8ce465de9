//! TrackSpeedEstimator: per-track buffering and two-stage speed smoothing.
//!
//! # Per observation
//! 1. Get-or-create the track state (resetting it if it went stale)
//! 2. Append (frame, x, y) to the position history (capacity round(fps))
//! 3. Fewer than fps / 2 samples → warming up, label `#id`
//! 4. Otherwise measure over the oldest → newest sample currently held:
//!    `v = (d / units_per_meter) / ((t1 - t0) / fps) * 3.6` km/h
//! 5. Push `v` into the speed history (last 10 readings) and report the mean
//!
//! The window grows to a full second while the track matures, then slides.
//! The rolling mean over instantaneous readings is the second smoothing stage.

use crate::{
    error::{require_positive, ConfigurationError, Result},
    retention::{Retention, RetentionPolicy},
    track::{TrackPhase, TrackState},
    types::{DisplayLabel, FrameIndex, GroundPoint, TrackId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// m/s → km/h
const MPS_TO_KMH: f64 = 3.6;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for the speed estimator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Frames per second of the source, used verbatim for buffer size and time.
    /// Not read from JSON: it comes from the session or the detection log.
    #[serde(skip)]
    pub fps: f64,
    /// Number of instantaneous readings averaged into the displayed speed
    pub speed_window: usize,
    /// Ground units per meter (100 when the calibration rectangle is in cm)
    pub units_per_meter: f64,
    /// When buffers of unobserved track ids are dropped
    pub retention: RetentionPolicy,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            speed_window: 10,
            units_per_meter: 100.0,
            retention: RetentionPolicy::default(),
        }
    }
}

impl EstimatorConfig {
    pub fn with_fps(fps: f64) -> Self {
        Self {
            fps,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("frame rate", self.fps)?;
        require_positive("units per meter", self.units_per_meter)?;
        if self.speed_window == 0 {
            return Err(ConfigurationError::EmptySpeedWindow.into());
        }
        Ok(())
    }

    /// Position history capacity: round(fps), at least one sample.
    pub fn history_len(&self) -> usize {
        (self.fps.round() as usize).max(1)
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Turns (track id, ground point, frame) observations into display labels.
///
/// Driven frame by frame from a single thread; `observe` takes `&mut self`.
#[derive(Clone, Debug)]
pub struct TrackSpeedEstimator {
    config: EstimatorConfig,
    history_len: usize,
    retention: Retention,
    tracks: HashMap<TrackId, TrackState>,
}

impl TrackSpeedEstimator {
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        let history_len = config.history_len();
        let retention = Retention::new(config.retention, history_len);
        tracing::info!(
            fps = config.fps,
            history_len,
            speed_window = config.speed_window,
            max_idle = ?retention.max_idle(),
            "speed estimator ready"
        );
        Ok(Self {
            config,
            history_len,
            retention,
            tracks: HashMap::new(),
        })
    }

    /// Feed one observation and get the label to draw for it.
    pub fn observe(
        &mut self,
        track_id: TrackId,
        ground: GroundPoint,
        frame: FrameIndex,
    ) -> DisplayLabel {
        let fps = self.config.fps;
        let units_per_meter = self.config.units_per_meter;

        let track = self.track_entry(track_id, frame);
        track.push_sample(frame, ground);

        if track.phase(fps) == TrackPhase::WarmingUp {
            let label = DisplayLabel::warming_up(track_id);
            track.last_label = Some(label);
            return label;
        }

        let (oldest, newest) = match track.positions.endpoints() {
            Some((a, b)) => (*a, *b),
            None => return DisplayLabel::warming_up(track_id),
        };

        let elapsed_s = (newest.frame as f64 - oldest.frame as f64) / fps;
        if elapsed_s <= 0.0 {
            tracing::warn!(
                track = %track_id,
                frame,
                "no elapsed time across the history window, keeping previous label"
            );
            return track
                .last_label
                .unwrap_or_else(|| DisplayLabel::warming_up(track_id));
        }

        let distance_m = oldest.position.distance_to(&newest.position) / units_per_meter;
        let speed_kmh = distance_m / elapsed_s * MPS_TO_KMH;
        track.speeds.push(speed_kmh);

        let smoothed = track.smoothed_speed().unwrap_or(speed_kmh);
        let label = DisplayLabel::with_speed(track_id, smoothed);
        track.last_label = Some(label);
        label
    }

    /// Get-or-create the state of `id`, resetting it if it went stale.
    fn track_entry(&mut self, id: TrackId, frame: FrameIndex) -> &mut TrackState {
        let (history_len, speed_window) = (self.history_len, self.config.speed_window);
        let retention = self.retention;

        let track = self.tracks.entry(id).or_insert_with(|| {
            tracing::debug!(track = %id, frame, "new track");
            TrackState::new(id, frame, history_len, speed_window)
        });
        if retention.is_stale(track.last_seen, frame) {
            tracing::debug!(
                track = %id,
                frame,
                last_seen = track.last_seen,
                "track reappeared after eviction window, restarting warm-up"
            );
            track.reset(frame);
        }
        track
    }

    /// Drop every track idle for longer than the retention window at `now`.
    /// Returns count of removed tracks.
    pub fn sweep(&mut self, now: FrameIndex) -> usize {
        let removed = self.retention.prune(&mut self.tracks, now);
        if removed > 0 {
            tracing::debug!(removed, live = self.tracks.len(), frame = now, "evicted idle tracks");
        }
        removed
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.tracks.contains_key(&id)
    }

    /// True if `id` is held and would continue its buffers at frame `now`.
    pub fn is_live(&self, id: TrackId, now: FrameIndex) -> bool {
        self.tracks
            .get(&id)
            .is_some_and(|t| !self.retention.is_stale(t.last_seen, now))
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackState> {
        self.tracks.get(&id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TrackState> {
        self.tracks.values()
    }

    pub fn phase(&self, id: TrackId) -> Option<TrackPhase> {
        self.tracks.get(&id).map(|t| t.phase(self.config.fps))
    }

    /// Current smoothed speed of a track, `None` while warming up or unknown.
    pub fn speed_kmh(&self, id: TrackId) -> Option<f64> {
        self.tracks.get(&id).and_then(|t| t.smoothed_speed())
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Reset: clear all tracks.
    pub fn reset(&mut self) {
        self.tracks.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
