//! # Camera Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An encoded frame as delivered by a camera driver
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CamFrame {
    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The format of this frame
    pub format: ImageFormat,

    /// The formatted image data
    pub data: Vec<u8>,
}

/// A decoded frame.
#[derive(Clone)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: DynamicImage,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible encodings of camera frames. This is used rather than image::ImageFormat to:
///     1. Restrict the formats that can be produced by the drivers
///     2. Allow serialisation as image::ImageFormat does not implement serde.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum ImageFormat {
    /// PNG image
    Png,

    /// JPEG image, including motion-JPEG frames from V4L2 devices
    Jpeg,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamFrame {
    /// Decode this camera frame into a camera image
    pub fn to_cam_image(&self) -> image::ImageResult<CamImage> {
        let format = match self.format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        };

        Ok(CamImage {
            timestamp: self.timestamp,
            image: image::load_from_memory_with_format(&self.data, format)?,
        })
    }
}

impl CamImage {
    /// Wrap an image, timestamping it now.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            timestamp: Utc::now(),
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Scale the image to the given width, keeping the aspect ratio.
    ///
    /// The image is returned unchanged if it is already the right width or if `width` is zero.
    pub fn resized_to_width(&self, width: u32) -> CamImage {
        if width == 0 || width == self.width() || self.width() == 0 {
            return self.clone();
        }

        let aspect = self.height() as f64 / self.width() as f64;
        let height = ((width as f64 * aspect).round() as u32).max(1);

        CamImage {
            timestamp: self.timestamp,
            image: self.image.resize_exact(width, height, FilterType::Triangle),
        }
    }

    /// Get an 8-bit grayscale copy of the image, as used by marker detection.
    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_resize_keeps_aspect() {
        let img = CamImage::new(DynamicImage::ImageRgb8(RgbImage::new(1280, 720)));

        let small = img.resized_to_width(640);
        assert_eq!((small.width(), small.height()), (640, 360));
        assert_eq!(small.timestamp, img.timestamp);

        let same = img.resized_to_width(1280);
        assert_eq!((same.width(), same.height()), (1280, 720));
    }

    #[test]
    fn test_to_luma() {
        let img = CamImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            4,
            2,
            image::Rgb([255, 255, 255]),
        )));

        let gray = img.to_luma();
        assert_eq!(gray.dimensions(), (4, 2));
        assert!(gray.pixels().all(|p| p[0] == 255));
    }
}
