//! Bounded FIFO buffers for per-track samples and speed readings.

use crate::types::{FrameIndex, GroundPoint};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One observation of a track on the ground plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSample {
    pub frame: FrameIndex,
    pub position: GroundPoint,
}

/// Fixed-capacity history: pushing onto a full buffer evicts the oldest entry.
#[derive(Clone, Debug)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

/// Mapped positions of one track, about one second deep.
pub type TrackHistory = BoundedHistory<PositionSample>;

/// Most recent instantaneous speeds of one track (km/h).
pub type SpeedHistory = BoundedHistory<f64>;

impl<T> BoundedHistory<T> {
    /// `capacity` is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, returning the evicted oldest entry if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl BoundedHistory<f64> {
    /// Arithmetic mean of the held values, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.items.iter().sum::<f64>() / self.items.len() as f64)
    }
}

impl BoundedHistory<PositionSample> {
    /// Oldest and newest samples: the span the speed is measured over.
    pub fn endpoints(&self) -> Option<(&PositionSample, &PositionSample)> {
        Some((self.items.front()?, self.items.back()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest_at_capacity() {
        let mut h = BoundedHistory::new(3);
        assert_eq!(h.push(1), None);
        assert_eq!(h.push(2), None);
        assert_eq!(h.push(3), None);
        assert!(h.is_full());
        assert_eq!(h.push(4), Some(1));
        assert_eq!(h.len(), 3);
        assert_eq!(h.oldest(), Some(&2));
        assert_eq!(h.newest(), Some(&4));
    }

    #[test]
    fn never_grows_past_capacity() {
        let mut h = BoundedHistory::new(10);
        for v in 0..1000 {
            h.push(v as f64);
            assert!(h.len() <= 10);
        }
        assert_eq!(h.len(), 10);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut h = BoundedHistory::new(0);
        assert_eq!(h.capacity(), 1);
        h.push('a');
        assert_eq!(h.push('b'), Some('a'));
    }

    #[test]
    fn mean_of_speed_history() {
        let mut h = SpeedHistory::new(2);
        assert_eq!(h.mean(), None);
        h.push(30.0);
        h.push(40.0);
        h.push(50.0);
        assert_eq!(h.mean(), Some(45.0));
    }

    #[test]
    fn endpoints_span_the_whole_buffer() {
        let mut h = TrackHistory::new(4);
        for f in 0..6 {
            h.push(PositionSample {
                frame: f,
                position: GroundPoint::new(0, f as i64 * 10),
            });
        }
        let (first, last) = h.endpoints().unwrap();
        assert_eq!(first.frame, 2);
        assert_eq!(last.frame, 5);
    }
}
