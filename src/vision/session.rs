//! Detection session
//!
//! One recognize-and-extract pass over a frame. Recognition is best-effort:
//! any backend failure is logged and reported as "nothing detected" so the
//! scan loop keeps going.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::codes::{extract_codes, DetectedCode};
use super::TextRecognizer;
use crate::capture::frame::CapturedFrame;

/// Runs recognition passes against a shared recognizer backend
#[derive(Clone)]
pub struct DetectionSession {
    recognizer: Arc<dyn TextRecognizer>,
}

impl DetectionSession {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Name of the recognizer backend
    pub fn backend(&self) -> &str {
        self.recognizer.name()
    }

    /// Detect the unique panel codes in a frame, in recognition order.
    ///
    /// Never fails: an unavailable recognizer yields an empty list.
    pub async fn detect(&self, frame: &CapturedFrame) -> Vec<DetectedCode> {
        let start = Instant::now();

        let tokens = match self.recognizer.recognize(frame).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Recognition via {} unavailable: {}", self.recognizer.name(), e);
                return vec![];
            }
        };

        let codes = dedupe_by_code(extract_codes(&tokens));
        let (width, height) = frame.dimensions();
        debug!(
            "Detection on {}x{} frame complete in {:?}: {} tokens, {} codes",
            width,
            height,
            start.elapsed(),
            tokens.len(),
            codes.len()
        );
        codes
    }
}

/// Keep the first occurrence of every code value, ignoring position
pub fn dedupe_by_code(codes: Vec<DetectedCode>) -> Vec<DetectedCode> {
    let mut seen = HashSet::new();
    codes
        .into_iter()
        .filter(|detected| seen.insert(detected.code.clone()))
        .collect()
}
