//! Track retention: when per-track buffers are dropped.
//!
//! # Policy
//! - A track is **stale** once more than `max_idle` frames separate its last
//!   observation from the current frame.
//! - Stale tracks are reset lazily when their id is observed again (the id
//!   re-enters warm-up) and swept from the map once per frame.
//! - `KeepForever` never drops anything: a reappearing id continues its
//!   buffers no matter how long it was gone.

use crate::{
    track::TrackState,
    types::{FrameIndex, TrackId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How long an unobserved track id keeps its buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Never evict
    KeepForever,
    /// Evict after as many idle frames as the position history holds (~1 s)
    HistoryWindow,
    /// Evict after the given number of idle frames
    IdleFrames(u64),
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::HistoryWindow
    }
}

/// Resolved retention rule for a given history length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Retention {
    max_idle: Option<u64>,
}

impl Retention {
    pub fn new(policy: RetentionPolicy, history_len: usize) -> Self {
        let max_idle = match policy {
            RetentionPolicy::KeepForever => None,
            RetentionPolicy::HistoryWindow => Some(history_len as u64),
            RetentionPolicy::IdleFrames(n) => Some(n),
        };
        Self { max_idle }
    }

    pub fn max_idle(&self) -> Option<u64> {
        self.max_idle
    }

    /// True if a track last seen at `last_seen` should be dropped at frame `now`.
    /// Frames running backwards never make a track stale.
    pub fn is_stale(&self, last_seen: FrameIndex, now: FrameIndex) -> bool {
        match self.max_idle {
            Some(limit) => now.saturating_sub(last_seen) > limit,
            None => false,
        }
    }

    /// Remove all stale tracks. Returns count of removed tracks.
    pub fn prune(&self, tracks: &mut HashMap<TrackId, TrackState>, now: FrameIndex) -> usize {
        if self.max_idle.is_none() {
            return 0;
        }
        let before = tracks.len();
        tracks.retain(|_, t| !self.is_stale(t.last_seen, now));
        before - tracks.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn track_seen_at(id: u64, frame: FrameIndex) -> (TrackId, TrackState) {
        let mut t = TrackState::new(TrackId(id), frame, 30, 10);
        t.push_sample(frame, Default::default());
        (TrackId(id), t)
    }

    #[test]
    fn history_window_uses_history_length() {
        let r = Retention::new(RetentionPolicy::HistoryWindow, 30);
        assert_eq!(r.max_idle(), Some(30));
        assert!(!r.is_stale(10, 40), "30 frames later is still within the window");
        assert!(r.is_stale(10, 41));
    }

    #[test]
    fn keep_forever_never_goes_stale() {
        let r = Retention::new(RetentionPolicy::KeepForever, 30);
        assert!(!r.is_stale(0, u64::MAX));
    }

    #[test]
    fn backwards_frames_are_not_stale() {
        let r = Retention::new(RetentionPolicy::IdleFrames(5), 30);
        assert!(!r.is_stale(100, 3));
    }

    #[test]
    fn prune_removes_only_stale_tracks() {
        let r = Retention::new(RetentionPolicy::IdleFrames(5), 30);
        let mut tracks: HashMap<_, _> = [track_seen_at(1, 0), track_seen_at(2, 8), track_seen_at(3, 10)]
            .into_iter()
            .collect();
        let removed = r.prune(&mut tracks, 10);
        assert_eq!(removed, 1);
        assert!(!tracks.contains_key(&TrackId(1)));
        assert!(tracks.contains_key(&TrackId(2)));
        assert!(tracks.contains_key(&TrackId(3)));
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        let p: RetentionPolicy = serde_json::from_str("\"keep_forever\"").unwrap();
        assert_eq!(p, RetentionPolicy::KeepForever);
        let p: RetentionPolicy = serde_json::from_str("{\"idle_frames\": 90}").unwrap();
        assert_eq!(p, RetentionPolicy::IdleFrames(90));
    }
}
