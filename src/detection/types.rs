// src/detection/types.rs
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Samples a wrist history needs before a swing can be reported.
pub const MIN_SWING_SAMPLES: usize = 4;

pub type TrackId = i64;

/// A single 2D keypoint in image pixels (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Placeholder for a keypoint the pose model did not report.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_usable(&self, min_confidence: f32) -> bool {
        self.confidence >= min_confidence
    }
}

/// The five landmarks the detector consumes for one subject in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubjectLandmarks {
    pub nose: Landmark,
    pub left_shoulder: Landmark,
    pub right_shoulder: Landmark,
    pub left_wrist: Landmark,
    pub right_wrist: Landmark,
}

/// One tracked subject as reported by the external tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseObservation {
    pub track_id: TrackId,
    /// [x1, y1, x2, y2] pixels, only carried through for the host
    pub bbox: [f32; 4],
    pub landmarks: SubjectLandmarks,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameObservations {
    pub frame_index: u64,
    pub timestamp_ms: Option<f64>,
    pub subjects: Vec<PoseObservation>,
}

impl FrameObservations {
    pub fn empty(frame_index: u64, timestamp_ms: Option<f64>) -> Self {
        Self {
            frame_index,
            timestamp_ms,
            subjects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackPhase {
    /// Too young to be evaluated
    Nascent,
    Idle,
    /// Inside the cooldown window after a trigger
    Active,
}

/// Heuristic thresholds for the smash detector.
///
/// Defaults are intentionally permissive (high recall).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// Keypoints below this confidence are unusable
    pub keypoint_conf_min: f32,
    /// Wrist history length per track
    pub history_len: usize,
    /// Frames a track stays active after a trigger
    pub cooldown_frames: u32,
    /// Wrist must be this many px above the nose
    pub head_margin: f32,
    /// Wrist must be this many px above the shoulder (negative allows below)
    pub shoulder_margin: f32,
    /// Downward speed over the last step, px/frame
    pub down_speed_threshold: f32,
    /// Drop from the window peak, px
    pub down_total_threshold: f32,
    /// Frames a track must be seen before it can trigger
    pub min_track_age: u32,
    /// Absent frames before a track's state is reaped (0 = never)
    pub max_absent_frames: u64,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            keypoint_conf_min: 0.25,
            history_len: 10,
            cooldown_frames: 12,
            head_margin: 6.0,
            shoulder_margin: -5.0,
            down_speed_threshold: 5.0,
            down_total_threshold: 12.0,
            min_track_age: 4,
            max_absent_frames: 30,
        }
    }
}

impl SwingConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.keypoint_conf_min.is_finite() && (0.0..=1.0).contains(&self.keypoint_conf_min),
            "keypoint_conf_min must be within [0, 1], got {}",
            self.keypoint_conf_min
        );
        ensure!(
            self.history_len >= MIN_SWING_SAMPLES,
            "history_len must be at least {}, got {}",
            MIN_SWING_SAMPLES,
            self.history_len
        );
        ensure!(self.cooldown_frames > 0, "cooldown_frames must be positive");
        ensure!(
            self.head_margin.is_finite() && self.shoulder_margin.is_finite(),
            "head_margin and shoulder_margin must be finite"
        );
        ensure!(
            self.down_speed_threshold.is_finite() && self.down_speed_threshold >= 0.0,
            "down_speed_threshold must be a non-negative number, got {}",
            self.down_speed_threshold
        );
        ensure!(
            self.down_total_threshold.is_finite() && self.down_total_threshold >= 0.0,
            "down_total_threshold must be a non-negative number, got {}",
            self.down_total_threshold
        );
        ensure!(self.min_track_age > 0, "min_track_age must be positive");
        Ok(())
    }
}
