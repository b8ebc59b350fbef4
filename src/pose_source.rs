// src/pose_source.rs
//
// Reads the tracker's per-frame pose dumps (JSON Lines, one frame per line).

use crate::detection::{FrameObservations, PoseObservation, SubjectLandmarks, TrackId};
use crate::types::InputConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

// Detections stay as raw JSON so one malformed entry only degrades itself.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    frame: Option<Value>,
    #[serde(default)]
    timestamp_ms: Option<Value>,
    #[serde(default)]
    detections: Option<Vec<Value>>,
}

pub struct PoseSource {
    config: InputConfig,
}

impl PoseSource {
    pub fn new(config: InputConfig) -> Self {
        Self { config }
    }

    pub fn find_pose_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| {
                    self.config
                        .extensions
                        .iter()
                        .any(|want| want.eq_ignore_ascii_case(ext))
                })
                .unwrap_or(false);
            if matches {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        info!("Found {} pose files", files.len());
        Ok(files)
    }

    pub fn open(&self, path: &Path) -> Result<PoseReader> {
        PoseReader::open(path, self.config.fps)
    }
}

/// Streams `FrameObservations` from one pose dump.
pub struct PoseReader {
    lines: Lines<BufReader<File>>,
    fps: Option<f64>,
    ordinal: u64,
    line_no: usize,
    path: PathBuf,
    untimed_frames: u64,
}

impl PoseReader {
    pub fn open(path: &Path, fps: Option<f64>) -> Result<Self> {
        info!("Opening pose dump: {}", path.display());
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            fps,
            ordinal: 0,
            line_no: 0,
            path: path.to_path_buf(),
            untimed_frames: 0,
        })
    }

    /// Frames that ended up with no timestamp (no `timestamp_ms` and no fps).
    pub fn untimed_frames(&self) -> u64 {
        self.untimed_frames
    }
}

impl Iterator for PoseReader {
    type Item = Result<FrameObservations>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_no += 1;
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(e).with_context(|| {
                        format!("Failed to read {} line {}", self.path.display(), self.line_no)
                    }))
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let frame = match parse_frame_line(&line, self.ordinal, self.fps) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(
                        "{} line {}: malformed frame ({}), treating as empty",
                        self.path.display(),
                        self.line_no,
                        e
                    );
                    FrameObservations::empty(self.ordinal, derive_timestamp(self.ordinal, self.fps))
                }
            };
            if frame.timestamp_ms.is_none() {
                if self.untimed_frames == 0 {
                    warn!(
                        "{} line {}: no timestamp_ms and no input.fps, events will be stamped 0.00.00",
                        self.path.display(),
                        self.line_no
                    );
                }
                self.untimed_frames += 1;
            }
            self.ordinal += 1;
            return Some(Ok(frame));
        }
    }
}

/// Parse one JSON Lines record. `ordinal` is the frame's position in the
/// dump, used when the record carries no explicit index.
///
/// Only a line that isn't a JSON object fails. Bad fields inside a detection
/// fall back per field: id to the detection's index, bbox to zeros, and each
/// unreadable keypoint to a zero-confidence landmark.
pub fn parse_frame_line(line: &str, ordinal: u64, fps: Option<f64>) -> Result<FrameObservations> {
    let raw: RawFrame = serde_json::from_str(line)?;
    let frame_index = raw.frame.as_ref().and_then(as_index).unwrap_or(ordinal);
    let timestamp_ms = raw
        .timestamp_ms
        .as_ref()
        .and_then(Value::as_f64)
        .or_else(|| derive_timestamp(frame_index, fps));

    let subjects = raw
        .detections
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, det)| parse_detection(i, det, frame_index))
        .collect();

    Ok(FrameObservations {
        frame_index,
        timestamp_ms,
        subjects,
    })
}

fn parse_detection(index: usize, det: &Value, frame_index: u64) -> PoseObservation {
    let id = det.get("id").filter(|v| !v.is_null());
    // Trackers that lose ids fall back to detection order
    let track_id = match id.map(as_track_id) {
        Some(Some(id)) => id,
        Some(None) => {
            warn!(
                "Frame {} detection {}: unusable id {}, using detection index",
                frame_index,
                index,
                id.map(|v| v.to_string()).unwrap_or_default()
            );
            index as TrackId
        }
        None => index as TrackId,
    };

    let bbox = det
        .get("bbox")
        .and_then(Value::as_array)
        .filter(|items| items.len() == 4)
        .and_then(|items| {
            let mut bbox = [0.0f32; 4];
            for (slot, v) in bbox.iter_mut().zip(items) {
                *slot = v.as_f64()? as f32;
            }
            Some(bbox)
        })
        .unwrap_or_default();

    let keypoints: Vec<[f32; 3]> = det
        .get("keypoints")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(parse_keypoint).collect())
        .unwrap_or_default();

    PoseObservation {
        track_id,
        bbox,
        landmarks: SubjectLandmarks::from_coco(&keypoints),
    }
}

/// `[x, y, conf]`; anything else reads as a zero-confidence point.
fn parse_keypoint(v: &Value) -> [f32; 3] {
    let read = |i: usize| v.get(i).and_then(Value::as_f64).map(|n| n as f32);
    match (read(0), read(1), read(2)) {
        (Some(x), Some(y), Some(c)) => [x, y, c],
        _ => [0.0; 3],
    }
}

/// Integer ids, including integral floats (some trackers emit `3.0`).
fn as_track_id(v: &Value) -> Option<TrackId> {
    v.as_i64().or_else(|| {
        v.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as TrackId)
    })
}

fn as_index(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn derive_timestamp(frame_index: u64, fps: Option<f64>) -> Option<f64> {
    fps.map(|fps| frame_index as f64 * 1000.0 / fps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Landmark, SwingConfig};
    use crate::pipeline::{FrameOutcome, SmashSession};
    use std::fs;

    fn coco_line(frame: u64, id: i64, wrist_y: f32) -> String {
        let mut kps = vec![[0.0f32, 0.0, 0.0]; 17];
        kps[0] = [100.0, 50.0, 0.9];
        kps[6] = [120.0, 150.0, 0.9];
        kps[10] = [140.0, wrist_y, 0.9];
        serde_json::json!({
            "frame": frame,
            "detections": [{"id": id, "bbox": [0, 0, 200, 400], "keypoints": kps}]
        })
        .to_string()
    }

    #[test]
    fn test_parse_full_record() {
        let frame = parse_frame_line(&coco_line(3, 7, 80.0), 0, Some(30.0)).unwrap();
        assert_eq!(frame.frame_index, 3);
        assert_eq!(frame.timestamp_ms, Some(100.0));
        assert_eq!(frame.subjects.len(), 1);
        assert_eq!(frame.subjects[0].track_id, 7);
        assert_eq!(frame.subjects[0].bbox, [0.0, 0.0, 200.0, 400.0]);
        assert_eq!(frame.subjects[0].landmarks.right_wrist, Landmark::new(140.0, 80.0, 0.9));
    }

    #[test]
    fn test_parse_fills_missing_fields() {
        let line = r#"{"detections": [{"keypoints": [[1, 2, 0.5]]}, {"bbox": [1, 1, 2, 2]}]}"#;
        let frame = parse_frame_line(line, 12, None).unwrap();
        assert_eq!(frame.frame_index, 12);
        assert_eq!(frame.timestamp_ms, None);
        assert_eq!(frame.subjects[0].track_id, 0);
        assert_eq!(frame.subjects[1].track_id, 1);
        assert_eq!(frame.subjects[0].landmarks.nose.confidence, 0.5);
        assert_eq!(frame.subjects[1].landmarks, SubjectLandmarks::default());
    }

    #[test]
    fn test_parse_explicit_timestamp_wins() {
        let frame = parse_frame_line(r#"{"frame": 9, "timestamp_ms": 512.5}"#, 0, Some(30.0)).unwrap();
        assert_eq!(frame.timestamp_ms, Some(512.5));
        assert!(frame.subjects.is_empty());

        let frame = parse_frame_line(r#"{"detections": null}"#, 4, None).unwrap();
        assert!(frame.subjects.is_empty());
    }

    #[test]
    fn test_malformed_detection_keeps_rest_of_frame() {
        let line = r#"{"frame": 7, "detections": [
            {"id": 1, "bbox": [0, 0, 200, 400], "keypoints": [[100, 50, 0.9]]},
            {"id": 3.0, "bbox": "wide", "keypoints": [[1, 2], [1, 2, null], "x", [5, 6, 0.7]]},
            {"id": "left", "keypoints": null}
        ]}"#;
        let frame = parse_frame_line(line, 0, Some(30.0)).unwrap();
        assert_eq!(frame.frame_index, 7);
        assert_eq!(frame.subjects.len(), 3);
        assert_eq!(frame.subjects[0].track_id, 1);
        assert_eq!(frame.subjects[0].landmarks.nose, Landmark::new(100.0, 50.0, 0.9));

        let odd = &frame.subjects[1];
        assert_eq!(odd.track_id, 3);
        assert_eq!(odd.bbox, [0.0; 4]);
        assert_eq!(odd.landmarks.nose, Landmark::missing());
        assert_eq!(odd.landmarks.left_shoulder, Landmark::missing());

        // Unusable id falls back to the detection's index
        assert_eq!(frame.subjects[2].track_id, 2);
        assert_eq!(frame.subjects[2].landmarks, SubjectLandmarks::default());
    }

    #[test]
    fn test_float_frame_index_accepted() {
        let frame = parse_frame_line(r#"{"frame": 12.0}"#, 0, Some(30.0)).unwrap();
        assert_eq!(frame.frame_index, 12);
        assert_eq!(frame.timestamp_ms, Some(400.0));

        let frame = parse_frame_line(r#"{"frame": -1}"#, 5, None).unwrap();
        assert_eq!(frame.frame_index, 5);
    }

    #[test]
    fn test_bad_detection_does_not_hide_active_track() {
        let mut session = SmashSession::new(SwingConfig::default()).unwrap();
        let mut lines: Vec<String> = (0..6).map(|f| coco_line(f, 1, 40.0)).collect();
        lines.push(coco_line(6, 1, 90.0));

        let mut noisy: Value = serde_json::from_str(&coco_line(7, 1, 90.0)).unwrap();
        noisy["detections"].as_array_mut().unwrap().push(serde_json::json!({
            "id": 3.0,
            "bbox": [0, 0, 10, 10],
            "keypoints": [[1, 2], [1, 2, null]]
        }));
        lines.push(noisy.to_string());
        lines.push(coco_line(8, 1, 90.0));

        let outcomes: Vec<FrameOutcome> = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let frame = parse_frame_line(line, i as u64, Some(30.0)).unwrap();
                session.process_frame(&frame)
            })
            .collect();

        assert_eq!(outcomes[6].logged_event.as_deref(), Some("0.00.20"));
        assert!(outcomes[7].any_active);
        assert_eq!(outcomes[7].active_tracks, vec![1]);
        assert!(outcomes[8].any_active);
        assert_eq!(session.event_log().entries(), ["0.00.20"]);
    }

    #[test]
    fn test_untimed_frames_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("untimed.jsonl");
        let contents = format!(
            "{}\n{{\"frame\": 1, \"timestamp_ms\": 33.0}}\n{}\n",
            coco_line(0, 1, 80.0),
            coco_line(2, 1, 80.0)
        );
        fs::write(&path, contents).unwrap();

        let mut reader = PoseReader::open(&path, None).unwrap();
        let frames: Vec<FrameObservations> = reader.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(reader.untimed_frames(), 2);

        let mut reader = PoseReader::open(&path, Some(30.0)).unwrap();
        reader.by_ref().for_each(drop);
        assert_eq!(reader.untimed_frames(), 0);
    }

    #[test]
    fn test_reader_recovers_from_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.jsonl");
        let contents = format!(
            "{}\n\nnot json at all\n{}\n",
            coco_line(0, 1, 80.0),
            coco_line(2, 1, 90.0)
        );
        fs::write(&path, contents).unwrap();

        let frames: Vec<FrameObservations> = PoseReader::open(&path, Some(10.0))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].subjects.len(), 1);
        // Malformed line became an empty frame at its ordinal
        assert_eq!(frames[1].frame_index, 1);
        assert_eq!(frames[1].timestamp_ms, Some(100.0));
        assert!(frames[1].subjects.is_empty());
        assert_eq!(frames[2].frame_index, 2);
    }

    #[test]
    fn test_find_pose_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("day2");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("b.jsonl"), "").unwrap();
        fs::write(nested.join("a.JSONL"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let source = PoseSource::new(InputConfig {
            input_dir: dir.path().to_string_lossy().into_owned(),
            ..InputConfig::default()
        });
        let files = source.find_pose_files().unwrap();
        assert_eq!(files, vec![dir.path().join("b.jsonl"), nested.join("a.JSONL")]);
    }

    #[test]
    fn test_open_missing_file_errors() {
        assert!(PoseReader::open(Path::new("/no/such/dump.jsonl"), None).is_err());
    }
}
