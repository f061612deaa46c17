//! Panel code extraction
//!
//! Filters recognized tokens down to three-digit panel codes and derives a
//! pixel rectangle for each from its bounding quadrilateral.

use std::fmt;
use tracing::{debug, trace};

use super::{TextToken, Vertex};

/// Number of digits in a panel code
pub const CODE_LENGTH: usize = 3;

/// Smallest width/height accepted for a code rectangle
pub const MIN_EXTENT: f32 = 8.0;

/// Pixel rectangle of a detected code. The origin may lie outside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

#[cfg(test)]
impl CodeRect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

impl fmt::Display for CodeRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.w, self.h)
    }
}

/// A panel code found in one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCode {
    /// Exactly three ASCII digits
    pub code: String,
    /// Where the code sits in the frame
    pub rect: CodeRect,
}

#[cfg(test)]
impl DetectedCode {
    pub fn new(code: impl Into<String>, rect: CodeRect) -> Self {
        Self {
            code: code.into(),
            rect,
        }
    }
}

/// Whether `code` is already a normalized panel code
pub fn is_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// Map ASCII and full-width digits to their ASCII form
fn to_ascii_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        '\u{FF10}'..='\u{FF19}' => char::from_u32(c as u32 - 0xFF10 + '0' as u32),
        _ => None,
    }
}

/// Normalize token text to a panel code.
///
/// Full-width digits become ASCII, every other character is dropped, and the
/// result is accepted only when exactly [`CODE_LENGTH`] digits remain.
pub fn normalize_code(text: &str) -> Option<String> {
    let digits: String = text.chars().filter_map(to_ascii_digit).collect();
    (digits.len() == CODE_LENGTH).then_some(digits)
}

/// Derive a code rectangle from a bounding quadrilateral.
///
/// Uses the top-left vertex for the origin, the top edge for the width and the
/// left edge for the height. Returns `None` for quads without four finite
/// vertices.
fn rect_from_quad(quad: &[Vertex]) -> Option<CodeRect> {
    if quad.len() < 4 || quad.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
        return None;
    }

    let top_left = quad[0];
    let top_right = quad[1];
    let bottom_left = quad[3];

    let w = (top_right.x - top_left.x).abs().max(MIN_EXTENT);
    let h = (bottom_left.y - top_left.y).abs().max(MIN_EXTENT);

    Some(CodeRect {
        x: top_left.x.round() as i32,
        y: top_left.y.round() as i32,
        w: w.round() as u32,
        h: h.round() as u32,
    })
}

/// Keep the tokens that read as panel codes, in input order
pub fn extract_codes(tokens: &[TextToken]) -> Vec<DetectedCode> {
    tokens
        .iter()
        .filter_map(|token| {
            let Some(code) = normalize_code(&token.text) else {
                trace!("Ignoring token {:?}", token.text);
                return None;
            };
            let Some(rect) = rect_from_quad(&token.quad) else {
                debug!("Dropping code {} with unusable geometry", code);
                return None;
            };
            Some(DetectedCode { code, rect })
        })
        .collect()
}
