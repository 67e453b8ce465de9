//! `sim`: Scenario simulator: vehicle trajectories, camera detections, detection logs.

pub mod camera_sim;
pub mod replay;
pub mod scenarios;
pub mod vehicle;

pub use camera_sim::{CameraParams, CameraSimulator};
pub use replay::{load_log, save_log, DetectionLog, GroundTruthFrame, VehicleState};
pub use scenarios::{Scenario, ScenarioKind};
pub use vehicle::{MotionSpec, Vehicle};
