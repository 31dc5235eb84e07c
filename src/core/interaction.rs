//! Pairwise interaction classification over tracked people.

use glam::{Quat, Vec3};

use super::body::TrackedBody;

/// Two people facing each other less than this far apart (in orientation
/// space) count as oriented away. Policy constant, candidate for a config
/// knob.
pub const FACING_ANGLE_DEG: f32 = 120.0;

/// Minimum head distance (meters) for the head variant's "not interacting"
/// branch.
pub const HEAD_DISTANCE_M: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    None,
    Interacting,
}

impl Interaction {
    pub fn as_int(self) -> u8 {
        match self {
            Interaction::None => 0,
            Interaction::Interacting => 1,
        }
    }
}

/// Root-orientation vector of a person: the quaternion's (x, y, z) part,
/// normalized directly.
///
/// This ignores w entirely, so it is only a true rotation axis when w ≈ 0.
/// The 120° facing policy was tuned against this projection; a proper
/// axis-angle conversion would shift classification outcomes.
pub fn orientation_axis(q: Quat) -> Vec3 {
    Vec3::new(q.x, q.y, q.z).try_normalize().unwrap_or(Vec3::ZERO)
}

/// Forward vector from an 8-corner head bounding box: centroid of the four
/// front corners minus centroid of the four back corners, normalized.
pub fn head_forward(head_bounding_box: &[[f32; 3]; 8]) -> Vec3 {
    let centroid = |corners: &[[f32; 3]]| {
        corners
            .iter()
            .fold(Vec3::ZERO, |acc, c| acc + Vec3::from_array(*c))
            / corners.len() as f32
    };
    let front = centroid(&head_bounding_box[..4]);
    let back = centroid(&head_bounding_box[4..]);
    (front - back).try_normalize().unwrap_or(Vec3::ZERO)
}

/// Angle between two vectors in degrees. The dot product is clamped to
/// [-1, 1] before the arccosine so floating-point overshoot on
/// near-parallel vectors cannot produce NaN.
pub fn vector_angle_deg(a: Vec3, b: Vec3) -> f32 {
    let dot = a.normalize_or_zero().dot(b.normalize_or_zero());
    dot.clamp(-1.0, 1.0).acos().to_degrees()
}

fn classify_pair(distance: f32, angle_deg: f32, min_distance: Option<f32>) -> Interaction {
    let apart = min_distance.map(|min| distance > min).unwrap_or(true);
    if angle_deg < FACING_ANGLE_DEG && apart {
        Interaction::None
    } else {
        Interaction::Interacting
    }
}

/// Body-level interaction check over the frame's full person list.
///
/// 0 or 1 person is trivially no interaction; any crowd of 3+ counts as
/// interacting regardless of geometry. For exactly 2 people the decision
/// is made from body positions and root-orientation vectors.
pub fn check_interaction(people: &[TrackedBody]) -> Interaction {
    match people {
        [] | [_] => Interaction::None,
        [a, b] => {
            let distance = a.position.distance(b.position);
            let angle = vector_angle_deg(
                orientation_axis(a.global_root_orientation),
                orientation_axis(b.global_root_orientation),
            );
            log::debug!("interaction: distance {:.3} angle {:.1}", distance, angle);
            classify_pair(distance, angle, None)
        }
        _ => Interaction::Interacting,
    }
}

/// Head-level variant: forward vectors derived from the head bounding box,
/// head positions for the distance, and "not interacting" additionally
/// requires the heads to be more than [`HEAD_DISTANCE_M`] apart.
pub fn check_interaction_using_head(people: &[TrackedBody]) -> Interaction {
    match people {
        [] | [_] => Interaction::None,
        [a, b] => {
            let distance = a.head_position.distance(b.head_position);
            let angle = vector_angle_deg(
                head_forward(&a.head_bounding_box),
                head_forward(&b.head_bounding_box),
            );
            classify_pair(distance, angle, Some(HEAD_DISTANCE_M))
        }
        _ => Interaction::Interacting,
    }
}
