//! # Preprocessing
//! Converts a decoded image into the NCHW float batch the classifier expects.
//!
//! Resolution and normalisation constants must match training. A mismatch
//! does not fail, it silently costs accuracy.

use image::{DynamicImage, imageops, imageops::FilterType};
use ndarray::Array4;

/// Input resolution of EfficientNet-B0.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// ImageNet channel statistics.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    pub width: u32,
    pub height: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::square(DEFAULT_INPUT_SIZE)
    }
}

impl Preprocessor {
    /// ImageNet-normalised square input.
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Convert to 8-bit RGB, resize exactly (no aspect preservation, bilinear),
    /// scale to [0, 1] and normalise each channel. Returns a batch of one,
    /// shape `[1, 3, H, W]`.
    pub fn apply(&self, image: &DynamicImage) -> Array4<f32> {
        let rgb = image.to_rgb8();
        let rgb = if rgb.dimensions() == (self.width, self.height) {
            rgb
        } else {
            imageops::resize(&rgb, self.width, self.height, FilterType::Triangle)
        };

        Array4::<f32>::from_shape_fn(
            (1, 3, self.height as usize, self.width as usize),
            |(_, c, y, x)| {
                let p = rgb.get_pixel(x as u32, y as u32);
                (p[c] as f32 / 255.0 - self.mean[c]) / self.std[c]
            },
        )
    }
}
