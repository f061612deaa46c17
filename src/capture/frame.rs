//! Frame data structures for captured camera content

use image::{DynamicImage, RgbaImage};

/// A captured frame from the camera
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Decoded RGBA pixels
    pub image: RgbaImage,
}

impl CapturedFrame {
    /// Create a new captured frame
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Wrap any decoded image, converting it to RGBA
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::new(image.to_rgba8())
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
