// src/pipeline/session.rs
//
// Owns all per-stream state: the track state machine, the event log and the
// run counters. Frames are processed strictly in order; every frame runs the
// rising-edge check, including frames with no subjects.

use super::event_log::EventLog;
use super::metrics::SessionStats;
use crate::detection::{FrameObservations, SwingConfig, TrackId, TrackStateMachine, TrackUpdate};
use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// Index actually used for this frame (after reorder repair)
    pub frame_index: u64,
    pub any_active: bool,
    pub active_tracks: Vec<TrackId>,
    pub updates: Vec<TrackUpdate>,
    /// Timestamp appended to the event log on this frame, if any
    pub logged_event: Option<String>,
}

pub struct SmashSession {
    machine: TrackStateMachine,
    log: EventLog,
    stats: SessionStats,
    last_frame: Option<u64>,
}

impl SmashSession {
    pub fn new(config: SwingConfig) -> Result<Self> {
        Self::with_log(config, EventLog::new())
    }

    /// Resume appending to an existing log.
    pub fn with_log(config: SwingConfig, log: EventLog) -> Result<Self> {
        Ok(Self {
            machine: TrackStateMachine::new(config)?,
            log,
            stats: SessionStats::new(),
            last_frame: None,
        })
    }

    pub fn process_frame(&mut self, frame: &FrameObservations) -> FrameOutcome {
        // Past the end of the index space no track can take another sample,
        // so the frame only feeds the edge check.
        let (frame_index, subjects) = match self.next_frame_index(frame.frame_index) {
            Some(index) => (index, frame.subjects.as_slice()),
            None => (u64::MAX, &[][..]),
        };

        let mut seen: HashSet<TrackId> = HashSet::with_capacity(subjects.len());
        let mut updates = Vec::with_capacity(subjects.len());

        for obs in subjects {
            if !seen.insert(obs.track_id) {
                debug!(
                    "Track {} reported twice in frame {}, ignoring duplicate",
                    obs.track_id, frame_index
                );
                self.stats.duplicate_observations += 1;
                continue;
            }

            let update = self.machine.update(frame_index, obs);
            // A reaped id that comes back starts a new track
            if self.machine.track(obs.track_id).map(|t| t.age) == Some(1) {
                self.stats.tracks_started += 1;
            }
            if update.triggered {
                self.stats.triggers += 1;
            }
            updates.push(update);
        }

        self.stats.tracks_reaped += self.machine.reap(frame_index) as u64;

        let active_tracks: Vec<TrackId> = updates
            .iter()
            .filter(|u| u.is_active())
            .map(|u| u.track_id)
            .collect();
        let any_active = !active_tracks.is_empty();

        let logged_event = self.log.observe_frame(any_active, frame.timestamp_ms);
        if let Some(stamp) = &logged_event {
            info!(
                "🏸 Smash at {} (frame {}, tracks {:?})",
                stamp, frame_index, active_tracks
            );
            self.stats.events_logged += 1;
        }

        self.stats.total_frames += 1;
        if !frame.subjects.is_empty() {
            self.stats.frames_with_subjects += 1;
        }
        if any_active {
            self.stats.frames_active += 1;
        }
        self.stats.observations += frame.subjects.len() as u64;

        FrameOutcome {
            frame_index,
            any_active,
            active_tracks,
            updates,
            logged_event,
        }
    }

    /// Wrist histories need strictly increasing frame indices. Returns `None`
    /// once the previous frame already used `u64::MAX`.
    fn next_frame_index(&mut self, requested: u64) -> Option<u64> {
        let index = match self.last_frame {
            Some(last) if requested <= last => {
                self.stats.reordered_frames += 1;
                let Some(next) = last.checked_add(1) else {
                    warn!(
                        "Frame index {} does not advance past {}, no index left; skipping track updates",
                        requested, last
                    );
                    return None;
                };
                warn!(
                    "Frame index {} does not advance past {}, using {}",
                    requested, last, next
                );
                next
            }
            _ => requested,
        };
        self.last_frame = Some(index);
        Some(index)
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn machine(&self) -> &TrackStateMachine {
        &self.machine
    }

    /// End the session, handing back the log for persistence.
    pub fn finish(self) -> (EventLog, SessionStats) {
        (self.log, self.stats)
    }
}
