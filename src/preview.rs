//! Preview Module
//!
//! Generates fixed-width JPEG thumbnails for JPEG attachments.
//!
//! ## Pipeline
//! 1. Decode the input strictly as JPEG
//! 2. Resize to the target width with Lanczos3, height keeping aspect ratio
//! 3. Encode as JPEG at the encoder's default quality
//!
//! Images narrower than the target width are scaled up to it. A source whose
//! scaled height would exceed [`MAX_JPEG_DIMENSION`] is rejected before any
//! pixels are resized.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::config::DEFAULT_PREVIEW_WIDTH;
use crate::error::{Result, VaultError};

/// Largest width or height a baseline JPEG can encode
pub const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;

/// Turns JPEG bytes into a fixed-width JPEG preview
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailGenerator {
    width: u32,
}

impl Default for ThumbnailGenerator {
    fn default() -> Self {
        Self {
            width: DEFAULT_PREVIEW_WIDTH,
        }
    }
}

impl ThumbnailGenerator {
    /// Create a generator for previews `width` pixels wide
    pub fn new(width: u32) -> Result<Self> {
        if width == 0 || width > MAX_JPEG_DIMENSION {
            return Err(VaultError::Config(format!(
                "preview width must be between 1 and {}, got {}",
                MAX_JPEG_DIMENSION, width
            )));
        }
        Ok(Self { width })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Decode, resize and re-encode a JPEG
    pub fn generate_preview(&self, jpeg_bytes: &[u8]) -> Result<Vec<u8>> {
        let img = image::load_from_memory_with_format(jpeg_bytes, ImageFormat::Jpeg)?;
        let height = self.target_height(img.width(), img.height());
        if height > MAX_JPEG_DIMENSION {
            return Err(VaultError::InvalidArgument(format!(
                "{}x{} image would need a {}x{} preview (max height {})",
                img.width(),
                img.height(),
                self.width,
                height,
                MAX_JPEG_DIMENSION
            )));
        }

        let resized = img.resize_exact(self.width, height, FilterType::Lanczos3);
        let encoded = encode_jpeg(&resized)?;

        tracing::debug!(
            from_width = img.width(),
            from_height = img.height(),
            width = self.width,
            height,
            size = encoded.len(),
            "preview: generated"
        );
        Ok(encoded)
    }

    /// Height that keeps the aspect ratio at the target width (at least 1)
    pub fn target_height(&self, width: u32, height: u32) -> u32 {
        if width == 0 {
            return 1;
        }
        let scaled = (height as f64 * self.width as f64 / width as f64).round();
        // `as` saturates, so absurd ratios land at u32::MAX and fail the bound check
        (scaled as u32).max(1)
    }
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new(&mut buf);
        match img {
            DynamicImage::ImageLuma8(gray) => encoder.encode_image(gray)?,
            other => encoder.encode_image(&other.to_rgb8())?,
        }
    }
    Ok(buf)
}
