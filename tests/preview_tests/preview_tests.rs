//! Tests for ThumbnailGenerator
//!
//! These tests verify:
//! - Previews are exactly the configured width
//! - Height follows the source aspect ratio
//! - Narrow sources are scaled up
//! - Non-JPEG input is rejected

#[path = "../common/mod.rs"]
mod common;

use common::{jpeg_dimensions, make_jpeg};
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, Luma};
use shardvault::preview::MAX_JPEG_DIMENSION;
use shardvault::{ThumbnailGenerator, VaultError};

// =============================================================================
// Dimension Tests
// =============================================================================

#[test]
fn test_preview_is_150_wide() {
    let gen = ThumbnailGenerator::default();

    let preview = gen.generate_preview(&make_jpeg(300, 200)).unwrap();

    assert_eq!(jpeg_dimensions(&preview), (150, 100));
}

#[test]
fn test_preview_rounds_height() {
    let gen = ThumbnailGenerator::default();

    // 333 * 150 / 640 = 78.05
    let preview = gen.generate_preview(&make_jpeg(640, 333)).unwrap();

    assert_eq!(jpeg_dimensions(&preview), (150, 78));
}

#[test]
fn test_portrait_preview() {
    let gen = ThumbnailGenerator::default();

    let preview = gen.generate_preview(&make_jpeg(200, 400)).unwrap();

    assert_eq!(jpeg_dimensions(&preview), (150, 300));
}

#[test]
fn test_narrow_source_is_scaled_up() {
    let gen = ThumbnailGenerator::default();

    let preview = gen.generate_preview(&make_jpeg(50, 40)).unwrap();

    assert_eq!(jpeg_dimensions(&preview), (150, 120));
}

#[test]
fn test_very_wide_source_keeps_one_row() {
    let gen = ThumbnailGenerator::default();

    let preview = gen.generate_preview(&make_jpeg(3000, 4)).unwrap();

    assert_eq!(jpeg_dimensions(&preview), (150, 1));
}

#[test]
fn test_custom_width() {
    let gen = ThumbnailGenerator::new(64).unwrap();

    let preview = gen.generate_preview(&make_jpeg(128, 96)).unwrap();

    assert_eq!(jpeg_dimensions(&preview), (64, 48));
}

#[test]
fn test_grayscale_source() {
    let img = GrayImage::from_fn(300, 150, |x, _| Luma([(x % 256) as u8]));
    let mut jpeg = Vec::new();
    JpegEncoder::new(&mut jpeg).encode_image(&img).unwrap();

    let preview = ThumbnailGenerator::default().generate_preview(&jpeg).unwrap();

    assert_eq!(jpeg_dimensions(&preview), (150, 75));
}

#[test]
fn test_preview_is_jpeg() {
    let preview = ThumbnailGenerator::default()
        .generate_preview(&make_jpeg(200, 200))
        .unwrap();

    assert_eq!(&preview[..2], &[0xFF, 0xD8]);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_garbage_is_rejected() {
    let err = ThumbnailGenerator::default()
        .generate_preview(b"definitely not a jpeg")
        .unwrap_err();

    assert!(matches!(err, VaultError::Image(_)));
}

#[test]
fn test_empty_input_is_rejected() {
    let err = ThumbnailGenerator::default().generate_preview(&[]).unwrap_err();

    assert!(matches!(err, VaultError::Image(_)));
}

#[test]
fn test_narrow_tall_source_is_rejected_before_resize() {
    // 1x2000 scaled to width 150 would be 150x300000
    let err = ThumbnailGenerator::default()
        .generate_preview(&make_jpeg(1, 2000))
        .unwrap_err();

    assert!(matches!(err, VaultError::InvalidArgument(_)));
    assert!(err.to_string().contains("300000"));
}

#[test]
fn test_tallest_encodable_preview() {
    // 150 * 436 / 1 = 65400, just under the JPEG limit
    let gen = ThumbnailGenerator::default();
    assert_eq!(gen.target_height(1, 436), 65400);
    assert!(gen.target_height(1, 437) > MAX_JPEG_DIMENSION);
}

#[test]
fn test_truncated_jpeg_is_rejected() {
    let jpeg = make_jpeg(200, 200);

    let result = ThumbnailGenerator::default().generate_preview(&jpeg[..20]);

    assert!(result.is_err());
}
