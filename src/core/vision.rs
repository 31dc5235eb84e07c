//! Face-expression inference boundary and the Google Cloud Vision binding.

use anyhow::bail;
use base64::Engine;
use serde::Deserialize;
use strum::EnumCount;

/// Six-level categorical confidence scale, ordinal 0–5.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumCount, strum::EnumIter, strum::IntoStaticStr)]
pub enum Expression {
    Joy,
    Sorrow,
    Anger,
    Surprise,
}

pub const NUM_EXPRESSIONS: usize = Expression::COUNT;

/// Expression likelihoods of one detected face, plus the headwear signal
/// used for the headwearer snapshot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExpressionSet {
    pub levels: [Likelihood; NUM_EXPRESSIONS],
    pub headwear: Likelihood,
}

impl ExpressionSet {
    pub fn level(&self, expression: Expression) -> Likelihood {
        self.levels[expression as usize]
    }
}

#[derive(Debug, Default, Clone)]
pub struct FaceAnnotation {
    /// Bounding polygon vertices in image pixels.
    pub vertices: Vec<[i32; 2]>,
    pub expressions: ExpressionSet,
}

/// A service that yields per-frame face/expression lists. Any concrete
/// binding (REST client, native SDK) satisfies this.
pub trait ExpressionService: Send {
    fn detect_faces(&self, image_jpeg: &[u8]) -> anyhow::Result<Vec<FaceAnnotation>>;
}

/// Inference disabled: no faces, ever. The summary layer turns this into
/// the neutral averages fallback.
pub struct NullExpression;

impl ExpressionService for NullExpression {
    fn detect_faces(&self, _image_jpeg: &[u8]) -> anyhow::Result<Vec<FaceAnnotation>> {
        Ok(Vec::new())
    }
}

const ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Google Cloud Vision FACE_DETECTION over REST.
///
/// No timeout is applied: a slow call stalls only the worker that made it.
pub struct GoogleVision {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl GoogleVision {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<FaceDetectionResponse>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaceDetectionResponse {
    #[serde(default)]
    face_annotations: Vec<RawFace>,
    error: Option<RawError>,
}

#[derive(Deserialize)]
struct RawError {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFace {
    #[serde(default)]
    bounding_poly: RawPoly,
    #[serde(default)]
    joy_likelihood: Likelihood,
    #[serde(default)]
    sorrow_likelihood: Likelihood,
    #[serde(default)]
    anger_likelihood: Likelihood,
    #[serde(default)]
    surprise_likelihood: Likelihood,
    #[serde(default)]
    headwear_likelihood: Likelihood,
}

#[derive(Default, Deserialize)]
struct RawPoly {
    #[serde(default)]
    vertices: Vec<RawVertex>,
}

#[derive(Deserialize)]
struct RawVertex {
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

impl From<RawFace> for FaceAnnotation {
    fn from(raw: RawFace) -> Self {
        FaceAnnotation {
            vertices: raw.bounding_poly.vertices.iter().map(|v| [v.x, v.y]).collect(),
            expressions: ExpressionSet {
                levels: [
                    raw.joy_likelihood,
                    raw.sorrow_likelihood,
                    raw.anger_likelihood,
                    raw.surprise_likelihood,
                ],
                headwear: raw.headwear_likelihood,
            },
        }
    }
}

impl ExpressionService for GoogleVision {
    fn detect_faces(&self, image_jpeg: &[u8]) -> anyhow::Result<Vec<FaceAnnotation>> {
        let content = base64::engine::general_purpose::STANDARD.encode(image_jpeg);
        let request = serde_json::json!({
            "requests": [{
                "image": { "content": content },
                "features": [{ "type": "FACE_DETECTION" }],
            }]
        });

        let text = self
            .client
            .post(ENDPOINT)
            .query(&[("key", self.api_key.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(request.to_string())
            .send()?
            .error_for_status()?
            .text()?;

        let parsed: AnnotateResponse = serde_json::from_str(&text)?;
        let response = parsed.responses.into_iter().next().unwrap_or_default();
        if let Some(error) = response.error {
            bail!("vision api error: {}", error.message);
        }

        Ok(response.face_annotations.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn likelihood_ordinals_match_wire_names() {
        let level: Likelihood = serde_json::from_str("\"VERY_LIKELY\"").unwrap();
        assert_eq!(level, Likelihood::VeryLikely);
        assert_eq!(level.ordinal(), 5);
        let level: Likelihood = serde_json::from_str("\"UNKNOWN\"").unwrap();
        assert_eq!(level.ordinal(), 0);
        assert_eq!(Likelihood::Possible.ordinal(), 3);
    }

    #[test]
    fn face_annotation_parses_from_api_shape() {
        let body = r#"{
            "responses": [{
                "faceAnnotations": [{
                    "boundingPoly": { "vertices": [{"x": 10, "y": 20}, {"x": 30}, {"y": 5}] },
                    "joyLikelihood": "LIKELY",
                    "sorrowLikelihood": "VERY_UNLIKELY",
                    "angerLikelihood": "UNLIKELY",
                    "surpriseLikelihood": "POSSIBLE",
                    "headwearLikelihood": "VERY_LIKELY"
                }]
            }]
        }"#;
        let parsed: AnnotateResponse = serde_json::from_str(body).unwrap();
        let face: FaceAnnotation = parsed
            .responses
            .into_iter()
            .next()
            .unwrap()
            .face_annotations
            .into_iter()
            .next()
            .unwrap()
            .into();
        assert_eq!(face.vertices, vec![[10, 20], [30, 0], [0, 5]]);
        assert_eq!(face.expressions.level(Expression::Joy), Likelihood::Likely);
        assert_eq!(face.expressions.level(Expression::Surprise), Likelihood::Possible);
        assert_eq!(face.expressions.headwear, Likelihood::VeryLikely);
    }

    #[test]
    fn api_error_surfaces_as_err() {
        let body = r#"{"responses": [{"error": {"message": "quota exceeded"}}]}"#;
        let parsed: AnnotateResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.responses[0].error.is_some());
    }
}
