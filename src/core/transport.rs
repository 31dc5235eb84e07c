//! Fire-and-forget UDP text transport and the payload builders.
//!
//! One destination host, one port per payload kind, newline-delimited
//! plain text. No acknowledgment, no retry; send errors are logged and
//! swallowed so a dead consumer never stalls the frame loop.
//!
//! Payloads are built from the flattened body mappings, not the typed
//! records: the transmission path consumes exactly what the serialization
//! adapter produced.

use std::net::UdpSocket;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use super::body::{FieldValue, FlatBody};
use super::ext_expression::ExpressionSummary;
use super::vision::{Expression, ExpressionSet, NUM_EXPRESSIONS};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkPorts {
    pub keypoints: u16,
    pub body_summaries: u16,
    pub interaction: u16,
    pub head_interaction: u16,
    pub person_count: u16,
    pub posture: u16,
    pub average_lines: u16,
    pub headwearer_lines: u16,
    pub averages_repr: u16,
}

impl Default for SinkPorts {
    fn default() -> Self {
        Self {
            keypoints: 1111,
            body_summaries: 2222,
            interaction: 100,
            head_interaction: 101,
            person_count: 102,
            posture: 200,
            average_lines: 402,
            headwearer_lines: 403,
            averages_repr: 405,
        }
    }
}

pub struct TextSink {
    socket: UdpSocket,
    host: String,
    pub ports: SinkPorts,
}

impl TextSink {
    pub fn new(host: &str, ports: SinkPorts) -> anyhow::Result<TextSink> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(TextSink {
            socket,
            host: host.to_string(),
            ports,
        })
    }

    /// Send one datagram. Returns whether it left the socket; failures are
    /// logged at warn and otherwise ignored.
    pub fn send(&self, port: u16, payload: &str) -> bool {
        match self.socket.send_to(payload.as_bytes(), (self.host.as_str(), port)) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("udp send to {}:{} failed: {}", self.host, port, e);
                false
            }
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

fn field<'a>(body: &'a FlatBody, name: &str) -> Option<&'a FieldValue> {
    body.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
}

fn zeroed(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}

fn row_line(row: &[f32]) -> String {
    row.iter()
        .map(|v| zeroed(*v).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Raw keypoint payload: a "Person {id}:" header and one "x y z" row per
/// joint. NaN joints are substituted with 0 here, at the formatting edge,
/// never in the flatten adapter.
pub fn keypoint_text(bodies: &[FlatBody]) -> String {
    let mut text = String::new();
    for body in bodies {
        let Some(FieldValue::Int(id)) = field(body, "id") else {
            continue;
        };
        text.push_str(&format!("Person {}:\n", id));
        if let Some(FieldValue::Rows(rows)) = field(body, "keypoint") {
            for row in rows {
                text.push_str(&row_line(row));
                text.push('\n');
            }
        }
        text.push('\n');
    }
    text
}

/// Per-person pose summary: ID, position, root orientation, head position
/// and the 8-corner head box.
pub fn body_summary_text(bodies: &[FlatBody]) -> String {
    let mut text = String::new();
    for body in bodies {
        let Some(FieldValue::Int(id)) = field(body, "id") else {
            continue;
        };
        text.push_str(&format!("ID:{}\n", id));
        if let Some(FieldValue::Series(p)) = field(body, "position") {
            text.push_str(&format!("Position:{}\n", row_line(p)));
        }
        if let Some(FieldValue::Series(q)) = field(body, "global_root_orientation") {
            text.push_str(&format!("Global Root Orientation:{}\n", row_line(q)));
        }
        if let Some(FieldValue::Series(h)) = field(body, "head_position") {
            text.push_str(&format!("Head Position:{}\n", row_line(h)));
        }
        if let Some(FieldValue::Rows(corners)) = field(body, "head_bounding_box") {
            text.push_str("Head Bounding Box:\n");
            for corner in corners {
                text.push_str(&row_line(corner));
                text.push('\n');
            }
        }
        text.push('\n');
    }
    text
}

/// "Joy:2.5" lines, one per expression.
pub fn average_lines(averages: &[f32; NUM_EXPRESSIONS]) -> String {
    Expression::iter()
        .map(|e| {
            let name: &'static str = e.into();
            format!("{}:{}", name, averages[e as usize])
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// JSON object form of the averages, for the repr port.
pub fn averages_repr(averages: &[f32; NUM_EXPRESSIONS]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = Expression::iter()
        .map(|e| {
            let name: &'static str = e.into();
            (name.to_string(), averages[e as usize].into())
        })
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// "Joy:3" lines for the headwearer's expression set, headwear included.
/// Empty when no headwearer snapshot exists (the consumer sees an empty
/// datagram, matching the reference).
pub fn headwearer_lines(headwearer: Option<&ExpressionSet>) -> String {
    let Some(set) = headwearer else {
        return String::new();
    };
    let mut lines: Vec<String> = Expression::iter()
        .map(|e| {
            let name: &'static str = e.into();
            format!("{}:{}", name, set.level(e).ordinal())
        })
        .collect();
    lines.push(format!("Headwear:{}", set.headwear.ordinal()));
    lines.join("\n")
}

/// All expression payloads for one frame, in (port, payload) form.
pub fn expression_payloads(ports: &SinkPorts, summary: &ExpressionSummary) -> Vec<(u16, String)> {
    vec![
        (ports.averages_repr, averages_repr(&summary.averages)),
        (
            ports.headwearer_lines,
            headwearer_lines(summary.headwearer.as_ref()),
        ),
        (ports.average_lines, average_lines(&summary.averages)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::body::{flatten_body, TrackedBody};
    use crate::core::vision::Likelihood;

    #[test]
    fn keypoint_text_substitutes_nan_with_zero() {
        let mut body = TrackedBody::default();
        body.id = 7;
        body.keypoint = vec![[1.0, f32::NAN, 3.0], [f32::NAN; 3]];
        let text = keypoint_text(&[flatten_body(&body)]);
        assert!(text.starts_with("Person 7:\n"));
        assert!(text.contains("1 0 3\n"));
        assert!(text.contains("0 0 0\n"));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn keypoint_text_separates_bodies_with_blank_line() {
        let mut a = TrackedBody::default();
        a.id = 1;
        a.keypoint = vec![[0.0; 3]];
        let mut b = TrackedBody::default();
        b.id = 2;
        b.keypoint = vec![[0.0; 3]];
        let text = keypoint_text(&[flatten_body(&a), flatten_body(&b)]);
        assert_eq!(text, "Person 1:\n0 0 0\n\nPerson 2:\n0 0 0\n\n");
    }

    #[test]
    fn body_summary_contains_expected_blocks() {
        let mut body = TrackedBody::default();
        body.id = 3;
        body.position = glam::Vec3::new(1.0, 2.0, 3.0);
        let text = body_summary_text(&[flatten_body(&body)]);
        assert!(text.contains("ID:3\n"));
        assert!(text.contains("Position:1 2 3\n"));
        assert!(text.contains("Global Root Orientation:0 0 0 1\n"));
        assert!(text.contains("Head Bounding Box:\n"));
        // 5 header lines + 8 corners + trailing blank
        assert_eq!(text.matches('\n').count(), 14);
    }

    #[test]
    fn average_lines_cover_all_four_expressions() {
        let lines = average_lines(&[1.0, 2.5, 0.0, 4.0]);
        assert_eq!(lines, "Joy:1\nSorrow:2.5\nAnger:0\nSurprise:4");
    }

    #[test]
    fn averages_repr_is_json() {
        let repr = averages_repr(&[1.0, 1.0, 1.0, 1.0]);
        let parsed: serde_json::Value = serde_json::from_str(&repr).unwrap();
        assert_eq!(parsed["Joy"], 1.0);
        assert_eq!(parsed["Surprise"], 1.0);
    }

    #[test]
    fn headwearer_lines_include_headwear_or_stay_empty() {
        assert_eq!(headwearer_lines(None), "");
        let set = ExpressionSet {
            levels: [
                Likelihood::Possible,
                Likelihood::Unknown,
                Likelihood::Unknown,
                Likelihood::VeryUnlikely,
            ],
            headwear: Likelihood::Likely,
        };
        let lines = headwearer_lines(Some(&set));
        assert_eq!(lines, "Joy:3\nSorrow:0\nAnger:0\nSurprise:1\nHeadwear:4");
    }

    #[test]
    fn sink_send_is_fire_and_forget() {
        let sink = TextSink::new("127.0.0.1", SinkPorts::default()).unwrap();
        assert!(sink.send(sink.ports.keypoints, "Person 0:\n"));
    }
}
