// src/detection/state_machine.rs
//
// Per-track gate composition and cooldown bookkeeping.
//
// Each observed track goes through, in order:
//   1. cooldown tick (before any trigger on this frame)
//   2. age increment
//   3. warm-up check: nascent tracks are not evaluated at all
//   4. arm-raised gate + downward-swing gate; both true refreshes cooldown
//
// A track is active for a frame while its cooldown is non-zero, so a single
// trigger yields exactly `cooldown_frames` active frames.
//
// Tracks only tick on frames where they are observed. A track that has been
// absent for more than `max_absent_frames` is dropped by `reap`.

use super::arm_gate::is_arm_raised;
use super::keypoints::select_arm;
use super::swing_tracker::WristTrajectory;
use super::types::{PoseObservation, SwingConfig, TrackId, TrackPhase};
use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TrackState {
    pub age: u32,
    pub cooldown: u32,
    pub last_seen_frame: u64,
    trajectory: WristTrajectory,
}

impl TrackState {
    fn new(history_len: usize, frame_index: u64) -> Self {
        Self {
            age: 0,
            cooldown: 0,
            last_seen_frame: frame_index,
            trajectory: WristTrajectory::new(history_len),
        }
    }

    pub fn phase(&self, min_track_age: u32) -> TrackPhase {
        if self.age < min_track_age {
            TrackPhase::Nascent
        } else if self.cooldown > 0 {
            TrackPhase::Active
        } else {
            TrackPhase::Idle
        }
    }

    pub fn history_len(&self) -> usize {
        self.trajectory.len()
    }
}

/// Outcome of feeding one observation to the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackUpdate {
    pub track_id: TrackId,
    pub phase: TrackPhase,
    /// Both gates passed on this frame
    pub triggered: bool,
    pub arm_raised: bool,
    pub swing_down: bool,
}

impl TrackUpdate {
    pub fn is_active(&self) -> bool {
        self.phase == TrackPhase::Active
    }
}

pub struct TrackStateMachine {
    config: SwingConfig,
    tracks: HashMap<TrackId, TrackState>,
}

impl TrackStateMachine {
    pub fn new(config: SwingConfig) -> Result<Self> {
        config.validate().context("Invalid swing detector configuration")?;
        Ok(Self {
            config,
            tracks: HashMap::new(),
        })
    }

    /// Process one track's observation for `frame_index`.
    ///
    /// The caller must feed each track at most once per frame, with strictly
    /// increasing frame indices.
    pub fn update(&mut self, frame_index: u64, obs: &PoseObservation) -> TrackUpdate {
        let cfg = &self.config;
        let state = self
            .tracks
            .entry(obs.track_id)
            .or_insert_with(|| TrackState::new(cfg.history_len, frame_index));

        state.last_seen_frame = frame_index;
        state.cooldown = state.cooldown.saturating_sub(1);
        state.age = state.age.saturating_add(1);

        if state.age < cfg.min_track_age {
            return TrackUpdate {
                track_id: obs.track_id,
                phase: TrackPhase::Nascent,
                triggered: false,
                arm_raised: false,
                swing_down: false,
            };
        }

        let arm = select_arm(&obs.landmarks);
        let arm_raised = is_arm_raised(&arm, cfg);
        // History is appended regardless of the raised gate
        let swing_down = state.trajectory.observe(
            frame_index,
            arm.wrist.y,
            cfg.down_speed_threshold,
            cfg.down_total_threshold,
        );

        let triggered = arm_raised && swing_down;
        if triggered {
            if state.cooldown > 0 {
                debug!(
                    "Track {} re-triggered at frame {} ({} frames left, refreshing)",
                    obs.track_id, frame_index, state.cooldown
                );
            } else {
                debug!(
                    "Track {} smash trigger at frame {} ({:?} wrist y={:.1})",
                    obs.track_id, frame_index, arm.side, arm.wrist.y
                );
            }
            state.cooldown = cfg.cooldown_frames;
        }

        TrackUpdate {
            track_id: obs.track_id,
            phase: state.phase(cfg.min_track_age),
            triggered,
            arm_raised,
            swing_down,
        }
    }

    /// Drop tracks not seen for more than `max_absent_frames`. Returns how
    /// many were removed.
    pub fn reap(&mut self, current_frame: u64) -> usize {
        let max_absent = self.config.max_absent_frames;
        if max_absent == 0 {
            return 0;
        }

        let before = self.tracks.len();
        self.tracks.retain(|id, state| {
            let absent = current_frame.saturating_sub(state.last_seen_frame);
            let keep = absent <= max_absent;
            if !keep {
                debug!("Reaping track {} after {} absent frames", id, absent);
            }
            keep
        });
        before - self.tracks.len()
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackState> {
        self.tracks.get(&id)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}
