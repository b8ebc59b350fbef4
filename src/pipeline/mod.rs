// src/pipeline/mod.rs

pub mod event_log;
pub mod metrics;
pub mod session;

pub use event_log::{format_timestamp_ms, EventLog, EventStore, DEFAULT_EVENT_KEY};
pub use metrics::{SessionStats, StatsSummary};
pub use session::{FrameOutcome, SmashSession};
