// src/detection/swing_tracker.rs

use super::types::MIN_SWING_SAMPLES;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingMeasurement {
    /// px/frame over the last step, positive = moving down
    pub down_speed: f32,
    /// Current y minus the highest point (min y) in the window
    pub total_drop: f32,
}

/// Bounded wrist-y history for one track.
#[derive(Debug, Clone)]
pub struct WristTrajectory {
    history: VecDeque<(u64, f32)>, // (frame_index, wrist_y)
    capacity: usize,
}

impl WristTrajectory {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a sample and report whether a downward swing just happened.
    ///
    /// Not edge-triggered: one swing can report true on several consecutive
    /// frames.
    pub fn observe(&mut self, frame_index: u64, wrist_y: f32, speed_thr: f32, drop_thr: f32) -> bool {
        self.push(frame_index, wrist_y);

        match self.measure() {
            Some(m) => m.down_speed >= speed_thr && m.total_drop >= drop_thr,
            None => false,
        }
    }

    fn push(&mut self, frame_index: u64, wrist_y: f32) {
        if let Some(&(last_frame, _)) = self.history.back() {
            debug_assert!(frame_index > last_frame, "wrist history must be strictly ordered");
        }
        self.history.push_back((frame_index, wrist_y));
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Speed and drop for the current window, once enough samples exist.
    pub fn measure(&self) -> Option<SwingMeasurement> {
        if self.history.len() < MIN_SWING_SAMPLES {
            return None;
        }

        let n = self.history.len();
        let (f1, y1) = self.history[n - 2];
        let (f2, y2) = self.history[n - 1];
        let df = f2.saturating_sub(f1).max(1) as f32;
        let down_speed = (y2 - y1) / df;

        let peak_high = self
            .history
            .iter()
            .map(|&(_, y)| y)
            .fold(f32::INFINITY, f32::min);

        Some(SwingMeasurement {
            down_speed,
            total_drop: y2 - peak_high,
        })
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
