//! Google Cloud Vision backend
//!
//! Sends the frame as a base64 JPEG to the `images:annotate` REST endpoint
//! with a `TEXT_DETECTION` feature and converts the word annotations into
//! [`TextToken`]s.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, DynamicImage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{RecognizerError, TextRecognizer, TextToken, Vertex};
use crate::capture::frame::CapturedFrame;
use crate::config::VisionSettings;

/// Longest error body kept in a [`RecognizerError::Status`]
const MAX_ERROR_BODY: usize = 256;

#[derive(Debug, Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: Vec<Feature<'a>>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Deserialize)]
struct BoundingPoly {
    #[serde(default)]
    vertices: Vec<ApiVertex>,
}

/// The service omits coordinates that are zero
#[derive(Debug, Deserialize)]
struct ApiVertex {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
}

/// Text recognizer backed by Google Cloud Vision
pub struct CloudVisionRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    jpeg_quality: u8,
    feature: String,
}

impl CloudVisionRecognizer {
    /// Create a recognizer. Without an API key every call fails fast with
    /// [`RecognizerError::MissingCredential`].
    pub fn new(settings: &VisionSettings, api_key: Option<String>) -> Result<Self, RecognizerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let api_key = api_key.filter(|key| !key.is_empty());
        if api_key.is_none() {
            info!("No Vision API key available; recognition is disabled until one is configured");
        }

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key,
            jpeg_quality: settings.jpeg_quality.clamp(1, 100),
            feature: settings.feature.clone(),
        })
    }

    /// Whether a credential is available
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl TextRecognizer for CloudVisionRecognizer {
    async fn recognize(&self, frame: &CapturedFrame) -> Result<Vec<TextToken>, RecognizerError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RecognizerError::MissingCredential);
        };

        let content = encode_frame_jpeg(frame, self.jpeg_quality)?;
        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent { content },
                features: vec![Feature {
                    kind: &self.feature,
                }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(RecognizerError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let tokens = parse_annotate_response(&text)?;
        debug!("Cloud Vision returned {} tokens", tokens.len());
        Ok(tokens)
    }

    fn name(&self) -> &str {
        "cloud-vision"
    }
}

/// Encode a frame as base64 JPEG
pub fn encode_frame_jpeg(frame: &CapturedFrame, quality: u8) -> Result<String, RecognizerError> {
    let rgb = DynamicImage::ImageRgba8(frame.image.clone()).to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(&rgb)?;
    Ok(STANDARD.encode(jpeg))
}

/// Parse an `images:annotate` response body into word tokens.
///
/// The first text annotation is the whole-image text block and is skipped;
/// the rest are individual words.
pub fn parse_annotate_response(body: &str) -> Result<Vec<TextToken>, RecognizerError> {
    let parsed: AnnotateResponse =
        serde_json::from_str(body).map_err(|e| RecognizerError::Malformed(e.to_string()))?;

    let Some(response) = parsed.responses.into_iter().next() else {
        return Ok(vec![]);
    };

    if let Some(error) = response.error {
        return Err(RecognizerError::Api(error.message));
    }

    Ok(response
        .text_annotations
        .into_iter()
        .skip(1)
        .map(|annotation| {
            let quad = annotation
                .bounding_poly
                .map(|poly| {
                    poly.vertices
                        .into_iter()
                        .map(|v| Vertex::new(v.x, v.y))
                        .collect()
                })
                .unwrap_or_default();
            TextToken::new(annotation.description, quad)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SAMPLE_RESPONSE: &str = r#"{
        "responses": [{
            "textAnnotations": [
                {
                    "locale": "en",
                    "description": "123\nEXIT\n",
                    "boundingPoly": {"vertices": [{"x": 5, "y": 5}, {"x": 300, "y": 5}, {"x": 300, "y": 90}, {"x": 5, "y": 90}]}
                },
                {
                    "description": "123",
                    "boundingPoly": {"vertices": [{"y": 10}, {"x": 50, "y": 10}, {"x": 50, "y": 30}, {"y": 30}]}
                },
                {
                    "description": "EXIT",
                    "boundingPoly": {"vertices": [{"x": 200, "y": 60}, {"x": 280, "y": 60}, {"x": 280, "y": 85}, {"x": 200, "y": 85}]}
                },
                {
                    "description": "456"
                }
            ]
        }]
    }"#;

    fn settings(endpoint: &str) -> VisionSettings {
        VisionSettings {
            endpoint: endpoint.to_string(),
            timeout_secs: 5,
            ..VisionSettings::default()
        }
    }

    fn test_frame() -> CapturedFrame {
        CapturedFrame::new(RgbaImage::from_pixel(16, 8, Rgba([200, 100, 50, 255])))
    }

    #[test]
    fn test_parse_skips_full_text_block() {
        let tokens = parse_annotate_response(SAMPLE_RESPONSE).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "123");
        assert_eq!(tokens[1].text, "EXIT");
    }

    #[test]
    fn test_parse_defaults_missing_coordinates_to_zero() {
        let tokens = parse_annotate_response(SAMPLE_RESPONSE).unwrap();
        assert_eq!(tokens[0].quad[0], Vertex::new(0.0, 10.0));
        assert_eq!(tokens[0].quad[3], Vertex::new(0.0, 30.0));
    }

    #[test]
    fn test_parse_annotation_without_polygon_has_empty_quad() {
        let tokens = parse_annotate_response(SAMPLE_RESPONSE).unwrap();
        assert!(tokens[2].quad.is_empty());
    }

    #[test]
    fn test_parse_empty_responses() {
        assert!(parse_annotate_response(r#"{"responses": [{}]}"#).unwrap().is_empty());
        assert!(parse_annotate_response(r#"{"responses": []}"#).unwrap().is_empty());
        assert!(parse_annotate_response("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"responses": [{"error": {"code": 7, "message": "API key not valid"}}]}"#;
        let result = parse_annotate_response(body);
        assert!(matches!(result, Err(RecognizerError::Api(msg)) if msg == "API key not valid"));
    }

    #[test]
    fn test_parse_malformed_body() {
        let result = parse_annotate_response("<html>oops</html>");
        assert!(matches!(result, Err(RecognizerError::Malformed(_))));
    }

    #[test]
    fn test_encode_frame_jpeg_round_trips_dimensions() {
        let encoded = encode_frame_jpeg(&test_frame(), 85).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_fast() {
        // Unroutable endpoint: the call must not reach the network
        let recognizer = CloudVisionRecognizer::new(&settings("http://192.0.2.1/"), None).unwrap();
        assert!(!recognizer.has_credential());

        let result = recognizer.recognize(&test_frame()).await;
        assert!(matches!(result, Err(RecognizerError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_empty_key_counts_as_missing() {
        let recognizer =
            CloudVisionRecognizer::new(&settings("http://192.0.2.1/"), Some(String::new())).unwrap();
        assert!(!recognizer.has_credential());
    }

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}/v1/images:annotate", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn test_recognize_against_local_service() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", SAMPLE_RESPONSE).await;
        let recognizer =
            CloudVisionRecognizer::new(&settings(&endpoint), Some("test-key".to_string())).unwrap();

        let tokens = recognizer.recognize(&test_frame()).await.unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "123");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/images:annotate?key=test-key"));
        assert!(request.contains("TEXT_DETECTION"));
        assert!(request.contains("\"content\""));
    }

    #[tokio::test]
    async fn test_recognize_reports_http_status() {
        let (endpoint, server) = serve_once("HTTP/1.1 403 Forbidden", r#"{"error": "denied"}"#).await;
        let recognizer =
            CloudVisionRecognizer::new(&settings(&endpoint), Some("bad-key".to_string())).unwrap();

        let result = recognizer.recognize(&test_frame()).await;
        assert!(matches!(result, Err(RecognizerError::Status { status: 403, .. })));
        server.await.unwrap();
    }
}
