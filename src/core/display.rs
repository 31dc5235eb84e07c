//! Display boundary: overlay construction is local, the actual windowing
//! binding is an external collaborator behind [`DisplaySink`].

use std::thread;
use std::time::Duration;

use strum::IntoEnumIterator;

use super::body::EncodedImage;
use super::vision::{Expression, FaceAnnotation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    None,
    Quit,
    TogglePause,
}

/// Axis-aligned rectangle plus an optional label, in image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
    pub label: Option<String>,
}

pub trait DisplaySink {
    /// Present one frame plus overlays and report any key press. Implied
    /// to pace the loop the way a windowing toolkit's key-wait would.
    fn present(&mut self, frame: &EncodedImage, overlays: &[Overlay]) -> KeyEvent;
}

/// Rectangle-and-label overlays from a face annotation list, one per face
/// with a non-empty bounding polygon.
pub fn face_overlays(faces: &[FaceAnnotation], show_labels: bool) -> Vec<Overlay> {
    let mut overlays = Vec::with_capacity(faces.len());
    for face in faces {
        if face.vertices.is_empty() {
            continue;
        }
        let x_min = face.vertices.iter().map(|v| v[0]).min().unwrap_or(0);
        let y_min = face.vertices.iter().map(|v| v[1]).min().unwrap_or(0);
        let x_max = face.vertices.iter().map(|v| v[0]).max().unwrap_or(0);
        let y_max = face.vertices.iter().map(|v| v[1]).max().unwrap_or(0);
        let label = show_labels.then(|| {
            let mut parts: Vec<String> = Expression::iter()
                .map(|e| {
                    let name: &'static str = e.into();
                    format!("{}: {}", name, face.expressions.level(e).ordinal())
                })
                .collect();
            parts.push(format!("Headwear: {}", face.expressions.headwear.ordinal()));
            parts.join(", ")
        });
        overlays.push(Overlay {
            x_min,
            y_min,
            x_max,
            y_max,
            label,
        });
    }
    overlays
}

/// No-window binding: logs overlays at debug, never emits a key, and
/// paces the loop at roughly the reference's 10 ms key-wait.
pub struct HeadlessDisplay {
    frame_wait: Duration,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self {
            frame_wait: Duration::from_millis(10),
        }
    }
}

impl DisplaySink for HeadlessDisplay {
    fn present(&mut self, frame: &EncodedImage, overlays: &[Overlay]) -> KeyEvent {
        if !overlays.is_empty() {
            log::debug!(
                "frame {}x{}: {} overlay(s)",
                frame.width,
                frame.height,
                overlays.len()
            );
        }
        thread::sleep(self.frame_wait);
        KeyEvent::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vision::{ExpressionSet, Likelihood};

    fn face(vertices: Vec<[i32; 2]>) -> FaceAnnotation {
        FaceAnnotation {
            vertices,
            expressions: ExpressionSet {
                levels: [
                    Likelihood::Possible,
                    Likelihood::Unknown,
                    Likelihood::Unknown,
                    Likelihood::Unknown,
                ],
                headwear: Likelihood::Unlikely,
            },
        }
    }

    #[test]
    fn overlay_rect_is_vertex_min_max() {
        let overlays = face_overlays(&[face(vec![[10, 40], [50, 5], [30, 30]])], false);
        assert_eq!(overlays.len(), 1);
        let o = &overlays[0];
        assert_eq!((o.x_min, o.y_min, o.x_max, o.y_max), (10, 5, 50, 40));
        assert!(o.label.is_none());
    }

    #[test]
    fn overlay_label_lists_all_expressions() {
        let overlays = face_overlays(&[face(vec![[0, 0], [1, 1]])], true);
        assert_eq!(
            overlays[0].label.as_deref(),
            Some("Joy: 3, Sorrow: 0, Anger: 0, Surprise: 0, Headwear: 2")
        );
    }

    #[test]
    fn empty_polygon_is_skipped() {
        let overlays = face_overlays(&[face(Vec::new()), face(vec![[2, 2]])], false);
        assert_eq!(overlays.len(), 1);
    }
}
