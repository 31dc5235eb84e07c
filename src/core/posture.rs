//! Single-person posture classification over shoulder joint angles.
//!
//! Operates on the provider's BODY_34 keypoint layout; the joint indices
//! below must stay in sync with whatever skeleton format the capture
//! binding emits.

pub const LEFT_HIP: usize = 22;
pub const LEFT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_HIP: usize = 18;
pub const RIGHT_SHOULDER: usize = 5;
pub const RIGHT_ELBOW: usize = 6;

/// Both shoulder angles below this mark the posture as closed. Policy
/// constant, candidate for a config knob.
pub const CLOSED_ANGLE_DEG: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    Open,
    Closed,
}

impl Posture {
    pub fn as_int(self) -> u8 {
        match self {
            Posture::Open => 0,
            Posture::Closed => 1,
        }
    }
}

/// Angle at `vertex` between the rays towards `a` and `c`, in degrees.
///
/// Planar: the z coordinate is ignored, this is a projection onto the
/// camera's image plane. The absolute value of an atan2 difference does
/// not fold into [0, 180]; the result ranges over [0, 360).
pub fn calculate_angle(a: [f32; 3], vertex: [f32; 3], c: [f32; 3]) -> f32 {
    let to_c = (c[1] - vertex[1]).atan2(c[0] - vertex[0]);
    let to_a = (a[1] - vertex[1]).atan2(a[0] - vertex[0]);
    (to_c - to_a).to_degrees().abs()
}

/// Classify one person's posture from their full keypoint array.
///
/// Returns `None` (indeterminate) when any coordinate of the six required
/// joints is NaN or the joint is missing entirely; callers skip the person.
pub fn classify_posture(keypoints: &[[f32; 3]]) -> Option<Posture> {
    let required = [
        LEFT_SHOULDER,
        LEFT_ELBOW,
        LEFT_HIP,
        RIGHT_SHOULDER,
        RIGHT_ELBOW,
        RIGHT_HIP,
    ];
    for index in required {
        let joint = keypoints.get(index)?;
        if joint.iter().any(|v| v.is_nan()) {
            return None;
        }
    }

    let left_angle = calculate_angle(
        keypoints[LEFT_ELBOW],
        keypoints[LEFT_SHOULDER],
        keypoints[LEFT_HIP],
    );
    let right_angle = calculate_angle(
        keypoints[RIGHT_ELBOW],
        keypoints[RIGHT_SHOULDER],
        keypoints[RIGHT_HIP],
    );

    if left_angle < CLOSED_ANGLE_DEG && right_angle < CLOSED_ANGLE_DEG {
        Some(Posture::Closed)
    } else {
        Some(Posture::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::body::NUM_KEYPOINTS;

    fn skeleton() -> Vec<[f32; 3]> {
        vec![[0.0; 3]; NUM_KEYPOINTS]
    }

    /// Arms hanging close to the torso: elbow barely off the shoulder-hip
    /// line on both sides.
    fn closed_skeleton() -> Vec<[f32; 3]> {
        let mut kp = skeleton();
        kp[LEFT_SHOULDER] = [1.0, 1.0, 0.0];
        kp[LEFT_HIP] = [1.0, 0.0, 0.0];
        kp[LEFT_ELBOW] = [1.1, 0.5, 0.0];
        kp[RIGHT_SHOULDER] = [-1.0, 1.0, 0.0];
        kp[RIGHT_HIP] = [-1.0, 0.0, 0.0];
        kp[RIGHT_ELBOW] = [-1.1, 0.5, 0.0];
        kp
    }

    #[test]
    fn nan_in_any_required_joint_is_indeterminate() {
        for index in [
            LEFT_HIP,
            LEFT_SHOULDER,
            LEFT_ELBOW,
            RIGHT_HIP,
            RIGHT_SHOULDER,
            RIGHT_ELBOW,
        ] {
            for axis in 0..3 {
                let mut kp = closed_skeleton();
                kp[index][axis] = f32::NAN;
                assert_eq!(classify_posture(&kp), None, "joint {} axis {}", index, axis);
            }
        }
    }

    #[test]
    fn nan_elsewhere_does_not_matter() {
        let mut kp = closed_skeleton();
        kp[0] = [f32::NAN; 3];
        assert_eq!(classify_posture(&kp), Some(Posture::Closed));
    }

    #[test]
    fn short_keypoint_array_is_indeterminate() {
        assert_eq!(classify_posture(&[[0.0; 3]; 10]), None);
    }

    #[test]
    fn both_angles_small_is_closed() {
        assert_eq!(classify_posture(&closed_skeleton()), Some(Posture::Closed));
    }

    #[test]
    fn one_raised_arm_is_open() {
        let mut kp = closed_skeleton();
        // left arm out sideways, ~90° at the shoulder
        kp[LEFT_ELBOW] = [2.0, 1.0, 0.0];
        assert_eq!(classify_posture(&kp), Some(Posture::Open));
    }

    #[test]
    fn angle_is_translation_invariant() {
        let a = [1.0, 0.2, 0.0];
        let v = [0.3, -0.1, 0.0];
        let c = [-0.5, 0.9, 0.0];
        let base = calculate_angle(a, v, c);
        for offset in [[10.0, -3.0, 5.0], [-200.0, 40.0, 0.0]] {
            let shift = |p: [f32; 3]| [p[0] + offset[0], p[1] + offset[1], p[2] + offset[2]];
            let shifted = calculate_angle(shift(a), shift(v), shift(c));
            assert!((base - shifted).abs() < 1e-3, "{} vs {}", base, shifted);
        }
    }

    #[test]
    fn angle_can_exceed_180_after_abs() {
        // rays at +170° and -170°: signed difference -340°, abs 340°
        let v = [0.0, 0.0, 0.0];
        let a = [(-170f32).to_radians().cos(), (-170f32).to_radians().sin(), 0.0];
        let c = [170f32.to_radians().cos(), 170f32.to_radians().sin(), 0.0];
        let angle = calculate_angle(a, v, c);
        assert!((angle - 340.0).abs() < 1e-2, "got {}", angle);
        assert!(angle < 360.0);
    }
}
