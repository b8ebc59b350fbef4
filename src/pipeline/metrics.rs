// src/pipeline/metrics.rs
//
// Run counters for one detection session. Exported via logs at the end of
// each input.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct SessionStats {
    pub total_frames: u64,
    pub frames_with_subjects: u64,
    pub frames_active: u64,
    pub observations: u64,
    pub duplicate_observations: u64,
    pub reordered_frames: u64,
    /// Track lifetimes begun; an id that is reaped and reappears counts again
    pub tracks_started: u64,
    pub tracks_reaped: u64,
    pub triggers: u64,
    pub events_logged: u64,
    pub started_at: Instant,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            total_frames: 0,
            frames_with_subjects: 0,
            frames_active: 0,
            observations: 0,
            duplicate_observations: 0,
            reordered_frames: 0,
            tracks_started: 0,
            tracks_reaped: 0,
            triggers: 0,
            events_logged: 0,
            started_at: Instant::now(),
        }
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.total_frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            total_frames: self.total_frames,
            frames_with_subjects: self.frames_with_subjects,
            frames_active: self.frames_active,
            observations: self.observations,
            duplicate_observations: self.duplicate_observations,
            reordered_frames: self.reordered_frames,
            tracks_started: self.tracks_started,
            tracks_reaped: self.tracks_reaped,
            triggers: self.triggers,
            events_logged: self.events_logged,
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsSummary {
    pub total_frames: u64,
    pub frames_with_subjects: u64,
    pub frames_active: u64,
    pub observations: u64,
    pub duplicate_observations: u64,
    pub reordered_frames: u64,
    pub tracks_started: u64,
    pub tracks_reaped: u64,
    pub triggers: u64,
    pub events_logged: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}
