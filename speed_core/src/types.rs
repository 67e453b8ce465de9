//! Fundamental types used across the entire workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a video frame, as counted by the external frame loop.
pub type FrameIndex = u64;

// ---------------------------------------------------------------------------
// Identifier types: newtype wrapper so tracker IDs are never confused with
// frame indices or class ids at compile time
// ---------------------------------------------------------------------------

/// Identifier issued by the external tracker. Not allocated here, only consumed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A point in image space (pixels, origin top-left).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for PixelPoint {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

/// A point on the ground plane, in integer ground units (centimeters by default).
///
/// Mapped coordinates are truncated toward zero, never rounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroundPoint {
    pub x: i64,
    pub y: i64,
}

impl GroundPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`, in ground units.
    pub fn distance_to(&self, other: &GroundPoint) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Detections
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box in pixels: (x1, y1) top-left, (x2, y2) bottom-right.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box of the given size whose bottom-center sits on `anchor`.
    pub fn from_anchor(anchor: PixelPoint, width: f64, height: f64) -> Self {
        Self {
            x1: anchor.x - width / 2.0,
            y1: anchor.y - height,
            x2: anchor.x + width / 2.0,
            y2: anchor.y,
        }
    }

    /// Bottom-center of the box: where the object touches the ground.
    pub fn anchor(&self) -> PixelPoint {
        PixelPoint::new((self.x1 + self.x2) / 2.0, self.y2)
    }
}

/// One object reported by the external detector/tracker in a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Detector class index (COCO ids in the usual setup)
    pub class_id: u32,
    pub confidence: f32,
    /// `None` when the tracker has not (yet) associated the box
    pub track_id: Option<TrackId>,
}

impl Detection {
    pub fn anchor(&self) -> PixelPoint {
        self.bbox.anchor()
    }
}

/// Everything the detector/tracker produced for one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame_index: FrameIndex,
    pub detections: Vec<Detection>,
}

// ---------------------------------------------------------------------------
// DisplayLabel
// ---------------------------------------------------------------------------

/// Text drawn next to a detection by the rendering collaborator.
///
/// Renders as `#<id>` while warming up and `#<id> <speed> Km/h` once a speed
/// is available. The displayed speed is truncated toward zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayLabel {
    pub track_id: TrackId,
    /// Smoothed speed in km/h, `None` while warming up
    pub speed_kmh: Option<f64>,
}

impl DisplayLabel {
    pub fn warming_up(track_id: TrackId) -> Self {
        Self {
            track_id,
            speed_kmh: None,
        }
    }

    pub fn with_speed(track_id: TrackId, speed_kmh: f64) -> Self {
        Self {
            track_id,
            speed_kmh: Some(speed_kmh),
        }
    }

    pub fn has_speed(&self) -> bool {
        self.speed_kmh.is_some()
    }
}

impl fmt::Display for DisplayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.speed_kmh {
            Some(speed) => write!(f, "{} {} Km/h", self.track_id, speed.trunc() as i64),
            None => write!(f, "{}", self.track_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_formats_like_the_overlay() {
        assert_eq!(DisplayLabel::warming_up(TrackId(7)).to_string(), "#7");
        assert_eq!(
            DisplayLabel::with_speed(TrackId(12), 36.0).to_string(),
            "#12 36 Km/h"
        );
        // Truncated, not rounded
        assert_eq!(
            DisplayLabel::with_speed(TrackId(3), 59.99).to_string(),
            "#3 59 Km/h"
        );
    }

    #[test]
    fn anchor_is_bottom_center() {
        let bbox = BoundingBox::new(100.0, 50.0, 140.0, 120.0);
        assert_eq!(bbox.anchor(), PixelPoint::new(120.0, 120.0));

        let rebuilt = BoundingBox::from_anchor(PixelPoint::new(120.0, 120.0), 40.0, 70.0);
        assert_eq!(rebuilt, bbox);
    }

    #[test]
    fn track_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&TrackId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
