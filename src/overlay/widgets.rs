//! Accent colors and the framed thumbnails drawn for rendered entries

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::warn;

/// Width of the accent frame drawn around thumbnails
pub const FRAME_WIDTH: u32 = 3;

/// Fallback when an accent color string can't be parsed
const FALLBACK_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Parse `#rrggbb`, `rrggbb` or `#rgb` into an opaque color
pub fn parse_hex_color(color: &str) -> Option<Rgba<u8>> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Rgba([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        ])),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Rgba([expand(0)?, expand(1)?, expand(2)?, 255]))
        }
        _ => None,
    }
}

/// Parse an accent color, falling back to white
pub fn accent_color(color: &str) -> Rgba<u8> {
    parse_hex_color(color).unwrap_or_else(|| {
        warn!("Unrecognized accent color {:?}, using white", color);
        FALLBACK_COLOR
    })
}

/// Copy of `image` with an accent frame drawn along its edges
pub fn framed_thumbnail(image: &RgbaImage, color: Rgba<u8>) -> RgbaImage {
    let mut framed = image.clone();
    let (w, h) = framed.dimensions();

    for inset in 0..FRAME_WIDTH {
        let inner_w = w.saturating_sub(inset * 2);
        let inner_h = h.saturating_sub(inset * 2);
        if inner_w == 0 || inner_h == 0 {
            break;
        }
        let rect = Rect::at(inset as i32, inset as i32).of_size(inner_w, inner_h);
        draw_hollow_rect_mut(&mut framed, rect, color);
    }

    framed
}
