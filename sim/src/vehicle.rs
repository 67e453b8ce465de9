//! Vehicle trajectory models and state propagation on the ground plane.
//!
//! Each vehicle has a true position (cm), a heading and a non-negative speed
//! along that heading (cm/s). A `MotionSpec` describes how the speed evolves;
//! the simulator steps each vehicle forward one frame at a time.

use serde::{Deserialize, Serialize};

/// cm per m
const CM_PER_M: f64 = 100.0;
/// m/s → km/h
const MPS_TO_KMH: f64 = 3.6;

/// Describes how a vehicle's speed changes over time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Constant velocity: heading and speed never change.
    ConstantVelocity,
    /// Constant acceleration along the heading (cm/s²). Braking stops at
    /// standstill, a vehicle never reverses.
    ConstantAccel { accel: f64 },
    /// Segmented: switch motion model at given sim times.
    /// `segments` is sorted by time ascending: [(t_start, MotionSpec), ...].
    /// The active spec is the last one whose t_start <= current_t.
    Segmented {
        segments: Vec<(f64, Box<MotionSpec>)>,
    },
}

impl MotionSpec {
    /// Resolve nested segments to the plain model in force at `t`.
    /// `None` before the first segment: the vehicle cruises.
    fn active_at(&self, t: f64) -> Option<&MotionSpec> {
        match self {
            MotionSpec::Segmented { segments } => segments
                .iter()
                .filter(|(t_start, _)| *t_start <= t)
                .last()
                .and_then(|(_, spec)| spec.active_at(t)),
            plain => Some(plain),
        }
    }
}

/// A simulated road user with ground-truth state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique vehicle ID, reported as the tracker id
    pub id: u64,
    /// Detector class (COCO: 2 car, 3 motorcycle, 5 bus, 7 truck)
    pub class_id: u32,
    /// True ground position [x, y] (cm)
    pub position: [f64; 2],
    /// Direction of travel (rad, 0 = +x, π/2 = +y)
    pub heading: f64,
    /// Speed along the heading (cm/s)
    pub speed: f64,
    pub motion: MotionSpec,
    /// Optional: vehicle appears after this time (no detections before)
    pub appear_at: Option<f64>,
    /// Optional: vehicle disappears after this time
    pub disappear_at: Option<f64>,
    /// Intervals [start, end) during which the vehicle is hidden from the camera
    #[serde(default)]
    pub occlusions: Vec<(f64, f64)>,
}

impl Vehicle {
    /// A car cruising at `speed_kmh` from `position` along `heading`.
    pub fn cruising(id: u64, position: [f64; 2], heading: f64, speed_kmh: f64) -> Self {
        Self {
            id,
            class_id: 2,
            position,
            heading,
            speed: speed_kmh / MPS_TO_KMH * CM_PER_M,
            motion: MotionSpec::ConstantVelocity,
            appear_at: None,
            disappear_at: None,
            occlusions: Vec::new(),
        }
    }

    /// Propagate true state by `dt` seconds according to motion spec.
    pub fn step(&mut self, t: f64, dt: f64) {
        let distance = match self.motion.active_at(t) {
            Some(&MotionSpec::ConstantAccel { accel }) if accel < 0.0 => {
                let stop_after = self.speed / -accel;
                if stop_after <= dt {
                    // Comes to rest within this step
                    let d = 0.5 * self.speed * stop_after;
                    self.speed = 0.0;
                    d
                } else {
                    let d = self.speed * dt + 0.5 * accel * dt * dt;
                    self.speed += accel * dt;
                    d
                }
            }
            Some(&MotionSpec::ConstantAccel { accel }) => {
                let d = self.speed * dt + 0.5 * accel * dt * dt;
                self.speed += accel * dt;
                d
            }
            _ => self.speed * dt,
        };
        self.position[0] += distance * self.heading.cos();
        self.position[1] += distance * self.heading.sin();
    }

    /// True if vehicle exists at time `t`.
    pub fn is_active(&self, t: f64) -> bool {
        if let Some(appear) = self.appear_at {
            if t < appear {
                return false;
            }
        }
        if let Some(disappear) = self.disappear_at {
            if t >= disappear {
                return false;
            }
        }
        true
    }

    /// Active and not hidden behind anything.
    pub fn is_visible(&self, t: f64) -> bool {
        self.is_active(t) && !self.occlusions.iter().any(|&(a, b)| (a..b).contains(&t))
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed / CM_PER_M * MPS_TO_KMH
    }
}
