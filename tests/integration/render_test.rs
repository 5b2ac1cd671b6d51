// Watermark rendering integration tests
//
// Exercise the full pipeline through the engine facade:
// - Output keeps the source dimensions and container format
// - JPEG output is quality 100 with full-resolution chroma
// - Undecodable or missing sources fail without leaving a cache entry
// - Both text rendering strategies produce visible marks

use super::test_harness::*;
use image::{GenericImageView, ImageFormat, Rgba};
use inkstamp::watermark::encoder::jpeg_sampling_factors;
use inkstamp::watermark::{OutputFormat, RenderRequest, TextStrategy, TileGrid, WatermarkError};
use rstest::rstest;
use tempfile::TempDir;

#[test]
fn test_jpeg_source_produces_full_chroma_jpeg_of_same_size() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 800, 600);

    let path = engine.render(&source, "CONFIDENTIAL").unwrap();
    assert!(path.starts_with(dir.path().join("cache")));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));

    let data = std::fs::read(&path).unwrap();
    assert!(!data.is_empty());
    assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Jpeg);
    assert_eq!(
        jpeg_sampling_factors(&data),
        Some(vec![(1, 1), (1, 1), (1, 1)])
    );

    let decoded = image::load_from_memory(&data).unwrap();
    assert_eq!(decoded.dimensions(), (800, 600));

    // White text at partial opacity lightens the dark base somewhere.
    let rgb = decoded.to_rgb8();
    let brightest = rgb.pixels().map(|p| p[0]).max().unwrap();
    assert!(brightest > 60, "no visible mark, brightest red {}", brightest);
}

#[test]
fn test_png_source_stays_png_with_alpha() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_png(&dir, "overlay.png", 320, 240, Rgba([0, 0, 0, 0]));

    let outcome = engine
        .render_request(&RenderRequest::new(&source, "DRAFT"))
        .unwrap();
    assert_eq!(outcome.format, OutputFormat::Png);
    assert!(outcome.path.to_string_lossy().ends_with(".jpg"));

    let data = std::fs::read(&outcome.path).unwrap();
    assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Png);
    let decoded = image::load_from_memory(&data).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (320, 240));

    // Untouched background stays transparent; marked pixels gain alpha.
    assert!(decoded.pixels().any(|p| p[3] == 0));
    assert!(decoded.pixels().any(|p| p[3] > 0));
}

#[test]
fn test_mask_strategy_never_exceeds_configured_opacity() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_png(&dir, "black.png", 400, 300, Rgba([0, 0, 0, 255]));

    let path = engine.render(&source, "AAAA BBBB").unwrap();
    let decoded = decode(&path).to_rgba8();

    // White at alpha 100/255 over opaque black tops out at 100.
    let brightest = decoded.pixels().map(|p| p[0]).max().unwrap();
    assert!(brightest > 0, "mark should be visible");
    assert!(brightest <= 101, "brightest {} exceeds opacity", brightest);
    assert!(decoded.pixels().all(|p| p[3] == 255));
}

#[rstest]
#[case(TextStrategy::Mask, -30.0)]
#[case(TextStrategy::Mask, 0.0)]
#[case(TextStrategy::Mask, 45.0)]
#[case(TextStrategy::Mask, 90.0)]
#[case(TextStrategy::Colored, -30.0)]
#[case(TextStrategy::Colored, 60.0)]
fn test_strategies_and_angles_keep_dimensions(#[case] strategy: TextStrategy, #[case] angle: f32) {
    let dir = TempDir::new().unwrap();
    let engine = engine_with(&dir, |config| {
        config.appearance.strategy = strategy;
        config.appearance.angle = angle;
    });
    let source = write_png(&dir, "grey.png", 257, 191, Rgba([90, 90, 90, 255]));

    let path = engine.render(&source, "stamp\nline two").unwrap();
    let decoded = decode(&path).to_rgba8();
    assert_eq!(decoded.dimensions(), (257, 191));
    assert!(
        decoded.pixels().any(|p| p[0] > 90),
        "{:?} at {} left no mark",
        strategy,
        angle
    );
}

#[rstest]
#[case(1, 1)]
#[case(5, 5)]
#[case(12, 3)]
fn test_tile_grid_overrides_render(#[case] columns: u32, #[case] rows: u32) {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 300, 200);

    let request = RenderRequest::new(&source, "grid").with_tile_grid(TileGrid { columns, rows });
    let outcome = engine.render_request(&request).unwrap();
    assert!(!outcome.cache_hit);
    let decoded = decode(&outcome.path);
    assert_eq!(decoded.dimensions(), (300, 200));
}

#[test]
fn test_tiny_image_still_renders() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "thumb.jpg", 8, 8);

    let path = engine.render(&source, "much longer than the image").unwrap();
    assert_eq!(decode(&path).dimensions(), (8, 8));
}

#[test]
fn test_undecodable_source_fails_without_entry() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = dir.path().join("broken.jpg");
    std::fs::write(&source, b"this is not an image at all").unwrap();

    let err = engine.render(&source, "x").unwrap_err();
    assert!(matches!(err, WatermarkError::Decode { .. }), "got {:?}", err);
    assert!(err.is_input_error());
    assert_eq!(cache_files(&engine), 0);
}

#[test]
fn test_missing_source_fails_without_entry() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);

    let err = engine.render(dir.path().join("nope.png"), "x").unwrap_err();
    assert!(matches!(err, WatermarkError::SourceRead { .. }));
    assert_eq!(cache_files(&engine), 0);
}

#[test]
fn test_long_lines_are_truncated_not_rejected() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 400, 300);
    let text = "W".repeat(500);

    let path = engine.render(&source, &text).unwrap();
    assert_eq!(decode(&path).dimensions(), (400, 300));
}

#[test]
fn test_custom_color_is_applied() {
    let dir = TempDir::new().unwrap();
    let engine = engine_with(&dir, |config| {
        config.appearance.color = "#FF0000".to_string();
        config.appearance.opacity = 1.0;
    });
    let source = write_png(&dir, "black.png", 300, 300, Rgba([0, 0, 0, 255]));

    let path = engine.render(&source, "RED").unwrap();
    let decoded = decode(&path).to_rgba8();
    assert!(decoded.pixels().any(|p| p[0] > 200 && p[1] == 0 && p[2] == 0));
    assert!(decoded.pixels().all(|p| p[1] == 0 && p[2] == 0));
}
