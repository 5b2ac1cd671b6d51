// Shared helpers for the watermark integration tests

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use inkstamp::cache::CacheConfig;
use inkstamp::config::WatermarkConfig;
use inkstamp::watermark::WatermarkEngine;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Base color of generated JPEG sources.
pub const JPEG_BASE: Rgb<u8> = Rgb([40, 60, 80]);

/// Config whose cache lives under `dir`.
pub fn config_in(dir: &TempDir) -> WatermarkConfig {
    WatermarkConfig {
        cache: CacheConfig {
            root: dir.path().join("cache"),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn engine_in(dir: &TempDir) -> WatermarkEngine {
    WatermarkEngine::new(config_in(dir)).expect("engine should build from defaults")
}

pub fn engine_with(dir: &TempDir, tweak: impl FnOnce(&mut WatermarkConfig)) -> WatermarkEngine {
    let mut config = config_in(dir);
    tweak(&mut config);
    WatermarkEngine::new(config).expect("engine should build")
}

pub fn write_jpeg(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.path().join(name);
    RgbImage::from_pixel(width, height, JPEG_BASE)
        .save(&path)
        .expect("write jpeg source");
    path
}

pub fn write_png(dir: &TempDir, name: &str, width: u32, height: u32, fill: Rgba<u8>) -> PathBuf {
    let path = dir.path().join(name);
    RgbaImage::from_pixel(width, height, fill)
        .save(&path)
        .expect("write png source");
    path
}

/// Push a file's modification time `age` into the past.
pub fn age_file(path: &Path, age: Duration) {
    let file = std::fs::File::options()
        .write(true)
        .open(path)
        .expect("open cache file");
    file.set_modified(SystemTime::now() - age)
        .expect("set mtime");
}

pub fn modified(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .expect("stat cache file")
}

/// Number of regular files in the engine's cache root.
pub fn cache_files(engine: &WatermarkEngine) -> u64 {
    engine.cache_stats().expect("cache stats").files
}

/// Decode a cache artifact by its content. Cache files always carry the
/// `.jpg` extension, so extension-based loading would misread PNG payloads.
pub fn decode(path: &Path) -> image::DynamicImage {
    let data = std::fs::read(path).expect("read cache file");
    image::load_from_memory(&data).expect("decode cache file")
}
