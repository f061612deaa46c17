//! Crop engine
//!
//! Cuts the area around a detected code out of the frame, using a margin
//! profile so the crop shows the panel the code belongs to.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::codes::CodeRect;

/// Margins added around a code rectangle, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropMargins {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl CropMargins {
    pub const fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Generous, roughly symmetric margin used for question thumbnails
    pub const fn question() -> Self {
        Self::new(24, 24, 24, 24)
    }

    /// Tall, bottom-weighted margin used for answer captures.
    /// The answer label sits below the code on the physical panel.
    pub const fn answer() -> Self {
        Self::new(8, 120, 32, 32)
    }
}

/// Compute the clamped crop window (x, y, width, height) inside an image.
///
/// The window is `rect` grown by `margins`, intersected with the image. It
/// may be empty when the rectangle lies entirely outside the image.
pub fn crop_bounds(
    image_width: u32,
    image_height: u32,
    rect: &CodeRect,
    margins: &CropMargins,
) -> (u32, u32, u32, u32) {
    let (img_w, img_h) = (image_width as i64, image_height as i64);

    let x0 = (rect.x as i64 - margins.left as i64).clamp(0, img_w);
    let y0 = (rect.y as i64 - margins.top as i64).clamp(0, img_h);
    let x1 = (rect.x as i64 + rect.w as i64 + margins.right as i64).clamp(x0, img_w);
    let y1 = (rect.y as i64 + rect.h as i64 + margins.bottom as i64).clamp(y0, img_h);

    (x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
}

/// Crop the margin window around `rect` out of `image`
pub fn crop_code(image: &RgbaImage, rect: &CodeRect, margins: &CropMargins) -> RgbaImage {
    let (x, y, w, h) = crop_bounds(image.width(), image.height(), rect, margins);
    if w == 0 || h == 0 {
        debug!("Crop window for {} is outside the frame", rect);
    }
    image::imageops::crop_imm(image, x, y, w, h).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn coordinate_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn test_crop_inside_image() {
        let img = coordinate_image(200, 200);
        let rect = CodeRect::new(50, 60, 30, 10);
        let margins = CropMargins::new(5, 15, 10, 20);

        let cropped = crop_code(&img, &rect, &margins);

        // [x-left, y-top, w+left+right, h+top+bottom]
        assert_eq!(cropped.dimensions(), (60, 30));
        assert_eq!(cropped.get_pixel(0, 0)[0], 40);
        assert_eq!(cropped.get_pixel(0, 0)[1], 55);
    }

    #[test]
    fn test_crop_clamps_negative_origin() {
        let img = coordinate_image(200, 100);
        let rect = CodeRect::new(10, 10, 50, 20);

        let (x, y, w, h) = crop_bounds(200, 100, &rect, &CropMargins::question());
        assert_eq!((x, y), (0, 0));
        // Far edges stay where the margins put them
        assert_eq!((w, h), (84, 54));

        let cropped = crop_code(&img, &rect, &CropMargins::question());
        assert_eq!(cropped.dimensions(), (84, 54));
    }

    #[test]
    fn test_crop_clamps_to_image_bounds() {
        let img = coordinate_image(100, 100);
        let rect = CodeRect::new(80, 70, 15, 10);

        let cropped = crop_code(&img, &rect, &CropMargins::answer());

        // x: 48..100, y: 62..100
        assert_eq!(cropped.dimensions(), (52, 38));
        assert_eq!(cropped.get_pixel(0, 0)[0], 48);
        assert_eq!(cropped.get_pixel(0, 0)[1], 62);
    }

    #[test]
    fn test_crop_with_origin_off_frame() {
        let img = coordinate_image(100, 100);
        let rect = CodeRect::new(-30, -5, 40, 20);
        let margins = CropMargins::new(0, 0, 0, 0);

        let (x, y, w, h) = crop_bounds(100, 100, &rect, &margins);
        assert_eq!((x, y, w, h), (0, 0, 10, 15));

        let cropped = crop_code(&img, &rect, &margins);
        assert_eq!(cropped.dimensions(), (10, 15));
        assert_eq!(cropped.get_pixel(9, 14)[0], 9);
        assert_eq!(cropped.get_pixel(9, 14)[1], 14);
    }

    #[test]
    fn test_crop_entirely_outside_is_empty() {
        let img = coordinate_image(50, 50);
        let rect = CodeRect::new(500, 500, 20, 20);

        let cropped = crop_code(&img, &rect, &CropMargins::question());
        assert_eq!(cropped.dimensions(), (0, 0));

        let rect = CodeRect::new(-500, -500, 20, 20);
        let cropped = crop_code(&img, &rect, &CropMargins::question());
        assert_eq!(cropped.dimensions(), (0, 0));
    }

    #[test]
    fn test_answer_profile_is_bottom_weighted() {
        let answer = CropMargins::answer();
        let question = CropMargins::question();
        assert!(answer.bottom > answer.top);
        assert_eq!(question.top, question.bottom);
        assert_eq!(question.left, question.right);
    }
}
