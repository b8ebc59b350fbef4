// src/detection/keypoints.rs
//
// COCO-17 keypoint extraction and wrist selection.

use super::types::{Landmark, SubjectLandmarks};

/// COCO-17 indices for the landmarks the detector reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum CocoKeypoint {
    Nose = 0,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftWrist = 9,
    RightWrist = 10,
}

impl CocoKeypoint {
    pub const COUNT: usize = 17;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// The selected arm: a wrist, the shoulder on the same side, and the nose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmLandmarks {
    pub side: Side,
    pub wrist: Landmark,
    pub shoulder: Landmark,
    pub nose: Landmark,
}

impl SubjectLandmarks {
    /// Build from a COCO-17 `[x, y, conf]` array. Indices past the end of a
    /// short array become zero-confidence landmarks.
    pub fn from_coco(keypoints: &[[f32; 3]]) -> Self {
        let get = |kp: CocoKeypoint| {
            keypoints
                .get(kp as usize)
                .map(|&[x, y, c]| Landmark::new(x, y, c))
                .unwrap_or_else(Landmark::missing)
        };

        Self {
            nose: get(CocoKeypoint::Nose),
            left_shoulder: get(CocoKeypoint::LeftShoulder),
            right_shoulder: get(CocoKeypoint::RightShoulder),
            left_wrist: get(CocoKeypoint::LeftWrist),
            right_wrist: get(CocoKeypoint::RightWrist),
        }
    }
}

/// Pick the wrist with the higher confidence (ties go right) and pair it with
/// the same-side shoulder. Confidences pass through untouched.
pub fn select_arm(landmarks: &SubjectLandmarks) -> ArmLandmarks {
    if landmarks.right_wrist.confidence >= landmarks.left_wrist.confidence {
        ArmLandmarks {
            side: Side::Right,
            wrist: landmarks.right_wrist,
            shoulder: landmarks.right_shoulder,
            nose: landmarks.nose,
        }
    } else {
        ArmLandmarks {
            side: Side::Left,
            wrist: landmarks.left_wrist,
            shoulder: landmarks.left_shoulder,
            nose: landmarks.nose,
        }
    }
}
