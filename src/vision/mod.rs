//! Vision/OCR Layer
//!
//! Turns a captured frame into the list of panel codes visible in it.
//! Text recognition itself is delegated to a [`TextRecognizer`] backend:
//! - Google Cloud Vision `images:annotate` (the production backend)
//! - scripted recognizers in tests

pub mod cloud_vision;
pub mod codes;
pub mod crop;
pub mod session;

use async_trait::async_trait;
use thiserror::Error;

use crate::capture::frame::CapturedFrame;

pub use cloud_vision::CloudVisionRecognizer;
pub use codes::{is_code, CodeRect, DetectedCode};
pub use crop::{crop_code, CropMargins};
pub use session::DetectionSession;

/// A corner of a token's bounding quadrilateral, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A piece of recognized text with its bounding polygon
#[derive(Debug, Clone, PartialEq)]
pub struct TextToken {
    /// Recognized text content
    pub text: String,
    /// Bounding quadrilateral, clockwise from the top-left corner
    pub quad: Vec<Vertex>,
}

impl TextToken {
    pub fn new(text: impl Into<String>, quad: Vec<Vertex>) -> Self {
        Self {
            text: text.into(),
            quad,
        }
    }

    /// Token with an axis-aligned box (x, y, width, height)
    #[cfg(test)]
    pub fn with_box(text: impl Into<String>, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(
            text,
            vec![
                Vertex::new(x, y),
                Vertex::new(x + w, y),
                Vertex::new(x + w, y + h),
                Vertex::new(x, y + h),
            ],
        )
    }
}

/// Reasons a recognition call produced no usable tokens
#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("no API credential configured")]
    MissingCredential,
    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    #[error("recognition request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("recognition service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("recognition service error: {0}")]
    Api(String),
    #[error("malformed recognition response: {0}")]
    Malformed(String),
}

/// Text recognition backend
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize every text token in the frame, in no particular order
    async fn recognize(&self, frame: &CapturedFrame) -> Result<Vec<TextToken>, RecognizerError>;

    /// Backend name for logs
    fn name(&self) -> &str;
}
