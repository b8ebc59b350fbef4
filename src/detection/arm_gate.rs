// src/detection/arm_gate.rs
//
// "Arm raised" gate. Deliberately permissive: either the shoulder or the
// nose comparison is enough, and the shoulder margin may be negative so a
// wrist slightly below the shoulder still counts.

use super::keypoints::ArmLandmarks;
use super::types::SwingConfig;

pub fn is_arm_raised(arm: &ArmLandmarks, cfg: &SwingConfig) -> bool {
    let min_conf = cfg.keypoint_conf_min;
    let shoulder_ok = arm.shoulder.is_usable(min_conf);
    let nose_ok = arm.nose.is_usable(min_conf);

    if !arm.wrist.is_usable(min_conf) || !(shoulder_ok || nose_ok) {
        return false;
    }

    // Smaller y is higher in the image
    let above_shoulder = shoulder_ok && arm.wrist.y < arm.shoulder.y - cfg.shoulder_margin;
    let above_head = nose_ok && arm.wrist.y < arm.nose.y - cfg.head_margin;

    above_shoulder || above_head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::keypoints::Side;
    use crate::detection::types::Landmark;

    fn arm(wrist_y: f32, shoulder: Landmark, nose: Landmark) -> ArmLandmarks {
        ArmLandmarks {
            side: Side::Right,
            wrist: Landmark::new(0.0, wrist_y, 0.9),
            shoulder,
            nose,
        }
    }

    #[test]
    fn test_wrist_above_shoulder_is_raised() {
        let cfg = SwingConfig::default();
        let a = arm(70.0, Landmark::new(0.0, 150.0, 0.9), Landmark::new(0.0, 50.0, 0.9));
        assert!(is_arm_raised(&a, &cfg));
    }

    #[test]
    fn test_negative_shoulder_margin_accepts_wrist_slightly_below() {
        let cfg = SwingConfig::default(); // shoulder_margin = -5
        let nose = Landmark::missing();
        assert!(is_arm_raised(&arm(154.0, Landmark::new(0.0, 150.0, 0.9), nose), &cfg));
        assert!(!is_arm_raised(&arm(155.0, Landmark::new(0.0, 150.0, 0.9), nose), &cfg));
    }

    #[test]
    fn test_nose_alone_can_raise() {
        let cfg = SwingConfig::default(); // head_margin = 6
        let shoulder = Landmark::new(0.0, 10.0, 0.05); // unusable
        assert!(is_arm_raised(&arm(43.0, shoulder, Landmark::new(0.0, 50.0, 0.9)), &cfg));
        assert!(!is_arm_raised(&arm(44.0, shoulder, Landmark::new(0.0, 50.0, 0.9)), &cfg));
    }

    #[test]
    fn test_unusable_wrist_never_raised() {
        let cfg = SwingConfig::default();
        let mut a = arm(0.0, Landmark::new(0.0, 150.0, 0.9), Landmark::new(0.0, 50.0, 0.9));
        a.wrist.confidence = 0.1;
        assert!(!is_arm_raised(&a, &cfg));
    }

    #[test]
    fn test_needs_a_usable_reference() {
        let cfg = SwingConfig::default();
        let a = arm(0.0, Landmark::new(0.0, 150.0, 0.1), Landmark::new(0.0, 50.0, 0.1));
        assert!(!is_arm_raised(&a, &cfg));
    }

    #[test]
    fn test_unusable_shoulder_is_ignored_even_if_geometry_passes() {
        let cfg = SwingConfig::default();
        // Shoulder geometry says raised but it's low confidence; nose says no.
        let a = arm(100.0, Landmark::new(0.0, 150.0, 0.1), Landmark::new(0.0, 50.0, 0.9));
        assert!(!is_arm_raised(&a, &cfg));
    }
}
