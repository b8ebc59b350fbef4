// src/main.rs

use anyhow::Result;
use smash_detection::config::CONFIG_PATH_ENV;
use smash_detection::pipeline::{EventLog, EventStore, SmashSession};
use smash_detection::pose_source::PoseSource;
use smash_detection::types::Config;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.yaml".to_string());
    let mut config = if Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🏸 Smash Detection Starting");
    if Path::new(&config_path).exists() {
        info!("✓ Configuration loaded from {}", config_path);
    } else {
        info!("No {} found, using built-in defaults", config_path);
    }

    let d = &config.detection;
    info!(
        "Thresholds: kp_conf={:.2}, history={}, cooldown={}, head={:.1}, shoulder={:.1}, speed={:.1}, drop={:.1}, min_age={}",
        d.keypoint_conf_min,
        d.history_len,
        d.cooldown_frames,
        d.head_margin,
        d.shoulder_margin,
        d.down_speed_threshold,
        d.down_total_threshold,
        d.min_track_age
    );

    let source = PoseSource::new(config.input.clone());
    let pose_files = source.find_pose_files()?;

    // Loading repairs the event key, so the store is written back even
    // when there is nothing to process.
    let json_path = PathBuf::from(&config.output.json_path);
    let key = config.output.event_key.as_str();
    let mut store = EventStore::load(&json_path)?;
    let mut log = EventLog::from_entries(store.events(key));
    let initial_events = log.len();

    if pose_files.is_empty() {
        error!("No pose files found in {}", config.input.input_dir);
        store.save(&json_path)?;
        info!("Log left at {} ({} events)", json_path.display(), initial_events);
        return Ok(());
    }

    for (idx, path) in pose_files.iter().enumerate() {
        info!("========================================");
        info!(
            "Processing pose dump {}/{}: {}",
            idx + 1,
            pose_files.len(),
            path.display()
        );

        match process_file(path, &source, &config, log.clone()) {
            Ok(updated) => log = updated,
            Err(e) => error!("Failed to process {}: {:#}", path.display(), e),
        }
    }

    store.set_events(key, log.entries());
    store.save(&json_path)?;

    info!("========================================");
    info!(
        "✅ Log saved: {} ({} new events, {} total)",
        json_path.display(),
        log.len() - initial_events,
        log.len()
    );

    Ok(())
}

fn process_file(path: &Path, source: &PoseSource, config: &Config, log: EventLog) -> Result<EventLog> {
    let mut reader = source.open(path)?;
    let mut session = SmashSession::with_log(config.detection.clone(), log)?;

    // A read failure ends this dump but keeps everything logged so far
    for frame in reader.by_ref() {
        match frame {
            Ok(frame) => {
                session.process_frame(&frame);
            }
            Err(e) => {
                error!("Stopping {} early: {:#}", path.display(), e);
                break;
            }
        }
    }

    let (log, stats) = session.finish();
    let summary = stats.summary();

    info!("✓ Pose dump processed");
    info!("  Total frames: {}", summary.total_frames);
    info!(
        "  Frames with subjects: {} ({:.1}%)",
        summary.frames_with_subjects,
        100.0 * summary.frames_with_subjects as f64 / summary.total_frames.max(1) as f64
    );
    info!("  Tracks started: {} (reaped {})", summary.tracks_started, summary.tracks_reaped);
    info!("  Triggers: {}", summary.triggers);
    if reader.untimed_frames() > 0 {
        warn!("  Frames without timestamps: {}", reader.untimed_frames());
    }
    info!("  🏸 Smash events logged: {}", summary.events_logged);
    info!("  Processing speed: {:.1} fps", summary.fps);
    if let Ok(json) = serde_json::to_string(&summary) {
        info!("  Summary: {}", json);
    }

    Ok(log)
}
