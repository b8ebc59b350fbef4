// src/detection/mod.rs

mod arm_gate;
mod keypoints;
mod state_machine;
mod swing_tracker;
mod types;

// Re-export public APIs
pub use arm_gate::is_arm_raised;
pub use keypoints::{select_arm, ArmLandmarks, CocoKeypoint, Side};
pub use state_machine::{TrackState, TrackStateMachine, TrackUpdate};
pub use swing_tracker::{SwingMeasurement, WristTrajectory};
pub use types::*;
