//! Raw image bytes to model input tensor
//!
//! The steps and constants here are a contract with the trained network. Any
//! change to the resize kernel or the normalization scheme changes the pixel
//! values the model sees and silently shifts predictions.

use crate::config::InputSize;
use crate::error::ImageDecodeError;
use image::imageops::{self, FilterType};
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cubic convolution with a = -0.5, the kernel PIL names BICUBIC
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// ImageNet channel means in RGB order, on the 0..=255 scale
pub const IMAGENET_MEAN_RGB: [f32; 3] = [123.68, 116.779, 103.939];

/// Channel normalization applied after the float conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// Keras EfficientNet contract: values stay on the 0..=255 scale and the
    /// network's own rescaling layers do the centering
    #[default]
    #[serde(rename = "efficientnet")]
    EfficientNet,
    /// Per-channel ImageNet mean subtraction, no rescale
    MeanSubtraction,
    /// `x / 127.5 - 1`, the MobileNet / Teachable Machine contract
    Symmetric,
}

impl Normalization {
    #[inline]
    pub fn apply(self, value: f32, channel: usize) -> f32 {
        match self {
            Normalization::EfficientNet => value,
            Normalization::MeanSubtraction => value - IMAGENET_MEAN_RGB[channel],
            Normalization::Symmetric => value / 127.5 - 1.0,
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Normalization::EfficientNet => "efficientnet",
            Normalization::MeanSubtraction => "mean-subtraction",
            Normalization::Symmetric => "symmetric",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "efficientnet" => Ok(Normalization::EfficientNet),
            "mean-subtraction" | "imagenet-mean" | "caffe" => Ok(Normalization::MeanSubtraction),
            "symmetric" | "mobilenet" | "tf" => Ok(Normalization::Symmetric),
            other => Err(format!("unknown normalization '{}'", other)),
        }
    }
}

/// Converts uploaded images into `(1, H, W, 3)` f32 tensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    input_size: InputSize,
    normalization: Normalization,
}

impl Preprocessor {
    pub fn new(input_size: InputSize, normalization: Normalization) -> Self {
        Self {
            input_size,
            normalization,
        }
    }

    pub fn input_size(&self) -> InputSize {
        self.input_size
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn preprocess(&self, raw: &[u8]) -> Result<Array4<f32>, ImageDecodeError> {
        if raw.is_empty() {
            return Err(ImageDecodeError::Empty);
        }

        // Grayscale, RGBA and palette sources all collapse to RGB here
        let rgb = image::load_from_memory(raw)?.to_rgb8();

        let InputSize { height, width } = self.input_size;
        let resized = imageops::resize(&rgb, width, height, RESIZE_FILTER);

        let normalization = self.normalization;
        let tensor = Array4::<f32>::from_shape_fn(
            (1, height as usize, width as usize, 3),
            |(_, y, x, c)| {
                let p = resized.get_pixel(x as u32, y as u32);
                normalization.apply(p[c] as f32, c)
            },
        );
        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    fn solid_rgb(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, Rgb(color));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    #[test]
    fn test_output_shape_matches_input_size() {
        let pre = Preprocessor::new(
            InputSize {
                height: 32,
                width: 48,
            },
            Normalization::EfficientNet,
        );
        let tensor = pre.preprocess(&solid_rgb(100, 60, [10, 20, 30])).unwrap();
        assert_eq!(tensor.shape(), &[1, 32, 48, 3]);
    }

    #[test]
    fn test_non_rgb_sources_are_converted() {
        let pre = Preprocessor::new(
            InputSize {
                height: 8,
                width: 8,
            },
            Normalization::EfficientNet,
        );

        let gray = encode(
            DynamicImage::ImageLuma8(GrayImage::from_pixel(5, 5, Luma([200]))),
            ImageFormat::Png,
        );
        let tensor = pre.preprocess(&gray).unwrap();
        assert_eq!(tensor.shape(), &[1, 8, 8, 3]);
        for c in 0..3 {
            assert!((tensor[[0, 4, 4, c]] - 200.0).abs() < 1e-3);
        }

        let rgba = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 5, Rgba([1, 2, 3, 128]))),
            ImageFormat::Png,
        );
        let tensor = pre.preprocess(&rgba).unwrap();
        assert_eq!(tensor.shape(), &[1, 8, 8, 3]);
        assert!((tensor[[0, 0, 0, 2]] - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_normalization_schemes() {
        let raw = solid_rgb(4, 4, [255, 127, 0]);
        let size = InputSize {
            height: 4,
            width: 4,
        };

        let passthrough = Preprocessor::new(size, Normalization::EfficientNet)
            .preprocess(&raw)
            .unwrap();
        assert_eq!(passthrough[[0, 1, 1, 0]], 255.0);
        assert_eq!(passthrough[[0, 1, 1, 1]], 127.0);

        let centered = Preprocessor::new(size, Normalization::MeanSubtraction)
            .preprocess(&raw)
            .unwrap();
        assert!((centered[[0, 1, 1, 0]] - (255.0 - 123.68)).abs() < 1e-4);
        assert!((centered[[0, 1, 1, 2]] + 103.939).abs() < 1e-4);

        let symmetric = Preprocessor::new(size, Normalization::Symmetric)
            .preprocess(&raw)
            .unwrap();
        assert!((symmetric[[0, 1, 1, 0]] - 1.0).abs() < 1e-6);
        assert!((symmetric[[0, 1, 1, 2]] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_non_image_payload() {
        let pre = Preprocessor::new(InputSize::default(), Normalization::default());
        assert!(matches!(pre.preprocess(b""), Err(ImageDecodeError::Empty)));
        assert!(matches!(
            pre.preprocess(b"definitely not an image"),
            Err(ImageDecodeError::Decode(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let pre = Preprocessor::new(
            InputSize {
                height: 16,
                width: 16,
            },
            Normalization::MeanSubtraction,
        );
        let mut img = RgbImage::new(40, 30);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([(x * 6) as u8, (y * 8) as u8, 77]);
        }
        let raw = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);
        assert_eq!(pre.preprocess(&raw).unwrap(), pre.preprocess(&raw).unwrap());
    }

    #[test]
    fn test_normalization_parse_round_trip() {
        for n in [
            Normalization::EfficientNet,
            Normalization::MeanSubtraction,
            Normalization::Symmetric,
        ] {
            assert_eq!(n.to_string().parse::<Normalization>().unwrap(), n);
        }
    }
}
