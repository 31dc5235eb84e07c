use std::sync::Arc;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// BODY_34 keypoint layout of the capture provider.
pub const NUM_KEYPOINTS: usize = 34;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum TrackingState {
    Off,
    #[default]
    Ok,
    Searching,
    Terminate,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum ActionState {
    #[default]
    Idle,
    Moving,
}

/// One frame's detection record for a single tracked person.
///
/// Produced by the capture provider, read-only to the rest of the app and
/// discarded once the frame's transmissions are done. Coordinates may carry
/// NaN for joints the provider could not resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedBody {
    pub id: i32,
    pub unique_object_id: Arc<str>,
    pub tracking_state: TrackingState,
    pub action_state: ActionState,
    pub position: Vec3,
    pub velocity: Vec3,
    pub confidence: f32,
    pub bounding_box_2d: [[f32; 2]; 4],
    pub bounding_box: [[f32; 3]; 8],
    pub dimensions: Vec3,
    pub keypoint_2d: Vec<[f32; 2]>,
    pub keypoint: Vec<[f32; 3]>,
    pub keypoint_confidence: Vec<f32>,
    pub local_position_per_joint: Vec<[f32; 3]>,
    pub local_orientation_per_joint: Vec<[f32; 4]>,
    pub head_bounding_box_2d: [[f32; 2]; 4],
    pub head_bounding_box: [[f32; 3]; 8],
    pub head_position: Vec3,
    pub global_root_orientation: Quat,
}

impl Default for TrackedBody {
    fn default() -> Self {
        Self {
            id: 0,
            unique_object_id: "".into(),
            tracking_state: TrackingState::default(),
            action_state: ActionState::default(),
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            confidence: 0.,
            bounding_box_2d: Default::default(),
            bounding_box: Default::default(),
            dimensions: Vec3::ZERO,
            keypoint_2d: vec![[0.; 2]; NUM_KEYPOINTS],
            keypoint: vec![[0.; 3]; NUM_KEYPOINTS],
            keypoint_confidence: vec![0.; NUM_KEYPOINTS],
            local_position_per_joint: vec![[0.; 3]; NUM_KEYPOINTS],
            local_orientation_per_joint: vec![[0., 0., 0., 1.]; NUM_KEYPOINTS],
            head_bounding_box_2d: Default::default(),
            head_bounding_box: Default::default(),
            head_position: Vec3::ZERO,
            global_root_orientation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CameraPose {
    pub translation: Vec3,
    pub orientation: Quat,
}

/// Color image as handed over by the capture binding, already encoded (JPEG).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub data: Vec<u8>,
}

/// Everything the provider delivers for one grabbed frame.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CapturedFrame {
    pub timestamp_ns: u64,
    pub is_new: bool,
    pub is_tracked: bool,
    #[serde(default)]
    pub camera_pose: CameraPose,
    #[serde(default)]
    pub image: EncodedImage,
    pub bodies: Vec<TrackedBody>,
}

/// A flattened field value. Keeps raw f32 payloads so NaN coming from the
/// provider survives untouched; substitution is the formatter's job.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Text(Arc<str>),
    Scalar(f32),
    Series(Vec<f32>),
    Rows(Vec<Vec<f32>>),
}

pub type FlatBody = Vec<(&'static str, FieldValue)>;

#[derive(Debug, Clone)]
pub struct FlatFrame {
    pub is_new: bool,
    pub is_tracked: bool,
    pub timestamp_ns: u64,
    pub body_list: Vec<FlatBody>,
}

fn rows2(rows: &[[f32; 2]]) -> FieldValue {
    FieldValue::Rows(rows.iter().map(|r| r.to_vec()).collect())
}

fn rows3(rows: &[[f32; 3]]) -> FieldValue {
    FieldValue::Rows(rows.iter().map(|r| r.to_vec()).collect())
}

fn rows4(rows: &[[f32; 4]]) -> FieldValue {
    FieldValue::Rows(rows.iter().map(|r| r.to_vec()).collect())
}

/// Flatten one body record into an ordered field mapping, every attribute
/// preserved verbatim. Pure transform, no error conditions.
pub fn flatten_body(body: &TrackedBody) -> FlatBody {
    vec![
        ("id", FieldValue::Int(body.id as i64)),
        ("unique_object_id", FieldValue::Text(body.unique_object_id.clone())),
        ("tracking_state", FieldValue::Text(body.tracking_state.to_string().into())),
        ("action_state", FieldValue::Text(body.action_state.to_string().into())),
        ("position", FieldValue::Series(body.position.to_array().to_vec())),
        ("velocity", FieldValue::Series(body.velocity.to_array().to_vec())),
        ("bounding_box_2d", rows2(&body.bounding_box_2d)),
        ("confidence", FieldValue::Scalar(body.confidence)),
        ("bounding_box", rows3(&body.bounding_box)),
        ("dimensions", FieldValue::Series(body.dimensions.to_array().to_vec())),
        ("keypoint_2d", rows2(&body.keypoint_2d)),
        ("keypoint", rows3(&body.keypoint)),
        ("keypoint_confidence", FieldValue::Series(body.keypoint_confidence.clone())),
        ("head_bounding_box_2d", rows2(&body.head_bounding_box_2d)),
        ("head_bounding_box", rows3(&body.head_bounding_box)),
        ("head_position", FieldValue::Series(body.head_position.to_array().to_vec())),
        ("local_position_per_joint", rows3(&body.local_position_per_joint)),
        ("local_orientation_per_joint", rows4(&body.local_orientation_per_joint)),
        (
            "global_root_orientation",
            FieldValue::Series(body.global_root_orientation.to_array().to_vec()),
        ),
    ]
}

pub fn flatten_frame(frame: &CapturedFrame) -> FlatFrame {
    FlatFrame {
        is_new: frame.is_new,
        is_tracked: frame.is_tracked,
        timestamp_ns: frame.timestamp_ns,
        body_list: frame.bodies.iter().map(flatten_body).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_covers_every_attribute_in_order() {
        let flat = flatten_body(&TrackedBody::default());
        let names: Vec<&str> = flat.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "id",
                "unique_object_id",
                "tracking_state",
                "action_state",
                "position",
                "velocity",
                "bounding_box_2d",
                "confidence",
                "bounding_box",
                "dimensions",
                "keypoint_2d",
                "keypoint",
                "keypoint_confidence",
                "head_bounding_box_2d",
                "head_bounding_box",
                "head_position",
                "local_position_per_joint",
                "local_orientation_per_joint",
                "global_root_orientation",
            ]
        );
    }

    #[test]
    fn flatten_preserves_nan() {
        let mut body = TrackedBody::default();
        body.keypoint[3] = [f32::NAN, 1.0, 2.0];
        let flat = flatten_body(&body);
        let (_, value) = flat.iter().find(|(n, _)| *n == "keypoint").unwrap();
        match value {
            FieldValue::Rows(rows) => {
                assert!(rows[3][0].is_nan());
                assert_eq!(rows[3][1], 1.0);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn flatten_keeps_array_fields_ordered() {
        let mut body = TrackedBody::default();
        body.position = Vec3::new(1.0, 2.0, 3.0);
        body.global_root_orientation = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
        let flat = flatten_body(&body);
        let series = |name: &str| match &flat.iter().find(|(n, _)| *n == name).unwrap().1 {
            FieldValue::Series(s) => s.clone(),
            other => panic!("unexpected value {:?}", other),
        };
        assert_eq!(series("position"), vec![1.0, 2.0, 3.0]);
        assert_eq!(series("global_root_orientation"), vec![0.1, 0.2, 0.3, 0.9]);
    }

    #[test]
    fn frame_flatten_carries_frame_fields() {
        let frame = CapturedFrame {
            timestamp_ns: 42,
            is_new: true,
            is_tracked: true,
            bodies: vec![TrackedBody::default(), TrackedBody::default()],
            ..Default::default()
        };
        let flat = flatten_frame(&frame);
        assert!(flat.is_new && flat.is_tracked);
        assert_eq!(flat.timestamp_ns, 42);
        assert_eq!(flat.body_list.len(), 2);
    }
}
