// src/lib.rs
//
// Online smash detector: per-track arm-raised + downward-swing gates over
// tracked pose keypoints, with cooldown debouncing and a rising-edge event log.

pub mod config;
pub mod detection;
pub mod pipeline;
pub mod pose_source;
pub mod types;

pub use detection::{FrameObservations, PoseObservation, SwingConfig, TrackId};
pub use pipeline::{EventLog, EventStore, FrameOutcome, SmashSession};
pub use types::Config;
