// Configuration file integration tests

use super::test_harness::*;
use inkstamp::config::WatermarkConfig;
use inkstamp::watermark::{TextStrategy, WatermarkEngine, WatermarkError};
use tempfile::TempDir;

#[test]
fn test_engine_from_yaml_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("inkstamp.yaml");
    let cache_root = dir.path().join("stamps");
    std::fs::write(
        &config_path,
        format!(
            "cache:\n  root: {}\n  ttl_seconds: 600\nappearance:\n  strategy: colored\n  angle: 20\n",
            cache_root.display()
        ),
    )
    .unwrap();

    let config = WatermarkConfig::from_file(&config_path).unwrap();
    assert_eq!(config.appearance.strategy, TextStrategy::Colored);
    let engine = WatermarkEngine::new(config).unwrap();

    let source = write_jpeg(&dir, "photo.jpg", 120, 80);
    let path = engine.render(&source, "yaml").unwrap();
    assert!(path.starts_with(&cache_root));
}

#[test]
fn test_invalid_config_is_rejected() {
    let yaml = "appearance:\n  tile_columns: 0\n";
    let config = WatermarkConfig::from_yaml_with_env(yaml).unwrap();
    let err = WatermarkEngine::new(config).unwrap_err();
    assert!(matches!(err, WatermarkError::Config(_)));
    assert!(err.to_string().contains("Tile grid"));
}

#[test]
fn test_custom_font_file() {
    let dir = TempDir::new().unwrap();
    let font_path = dir.path().join("face.ttf");
    std::fs::write(
        &font_path,
        include_bytes!("../../src/watermark/fonts/DejaVuSansMono.ttf"),
    )
    .unwrap();

    let engine = engine_with(&dir, |config| config.appearance.font_path = Some(font_path));
    let source = write_jpeg(&dir, "photo.jpg", 100, 100);
    assert!(engine.render(&source, "custom face").is_ok());
}
