// Watermark cache integration tests
//
// Covers cache behavior seen through the engine:
// - Repeat renders within the TTL reuse the same file untouched
// - Distinct texts and appearances never share a file
// - Expired entries are regenerated on demand and deleted by cleanup
// - Size reporting and clearing

use super::test_harness::*;
use inkstamp::cache::CacheKey;
use inkstamp::watermark::RenderRequest;
use std::time::Duration;
use tempfile::TempDir;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[test]
fn test_repeat_render_within_ttl_reuses_file() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 320, 240);

    let first = engine.render(&source, "CONFIDENTIAL").unwrap();
    let bytes = std::fs::read(&first).unwrap();
    // Backdate so a rewrite would be visible as a newer mtime.
    age_file(&first, Duration::from_secs(3600));
    let stamped = modified(&first);

    let second = engine
        .render_request(&RenderRequest::new(&source, "CONFIDENTIAL"))
        .unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.path, first);
    assert_eq!(std::fs::read(&first).unwrap(), bytes);
    assert_eq!(modified(&first), stamped);
    assert_eq!(cache_files(&engine), 1);
}

#[test]
fn test_different_text_never_collides() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 200, 200);

    let a = engine.render(&source, "A").unwrap();
    let b = engine.render(&source, "B").unwrap();
    assert_ne!(a, b);
    assert!(a.exists() && b.exists());
    assert_eq!(cache_files(&engine), 2);
}

#[test]
fn test_cache_file_named_by_digest() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 64, 64);

    let path = engine.render(&source, "digest").unwrap();
    let key = CacheKey::new(&source.to_string_lossy(), "digest");
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some(key.file_name().as_str())
    );
}

#[test]
fn test_expired_entry_is_regenerated() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 160, 120);

    let path = engine.render(&source, "refresh").unwrap();
    age_file(&path, DAY + Duration::from_secs(60));
    let stale = modified(&path);

    let outcome = engine
        .render_request(&RenderRequest::new(&source, "refresh"))
        .unwrap();
    assert!(!outcome.cache_hit);
    assert_eq!(outcome.path, path);
    assert!(modified(&path) > stale);
    assert_eq!(cache_files(&engine), 1);
}

#[test]
fn test_short_ttl_from_config() {
    let dir = TempDir::new().unwrap();
    let engine = engine_with(&dir, |config| config.cache.ttl_seconds = 60);
    let source = write_jpeg(&dir, "photo.jpg", 64, 64);

    let path = engine.render(&source, "short").unwrap();
    age_file(&path, Duration::from_secs(120));

    let outcome = engine
        .render_request(&RenderRequest::new(&source, "short"))
        .unwrap();
    assert!(!outcome.cache_hit);
}

#[test]
fn test_empty_cache_file_is_regenerated() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 64, 64);

    let path = engine.render(&source, "zero").unwrap();
    std::fs::write(&path, b"").unwrap();

    let outcome = engine
        .render_request(&RenderRequest::new(&source, "zero"))
        .unwrap();
    assert!(!outcome.cache_hit);
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn test_cleanup_removes_only_expired() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 96, 96);

    let keep = engine.render(&source, "keep").unwrap();
    let drop = engine.render(&source, "drop").unwrap();
    age_file(&drop, DAY * 2);

    let report = engine.cleanup().unwrap();
    assert_eq!(report.removed, 1);
    assert!(keep.exists());
    assert!(!drop.exists());
    assert_eq!(report.remaining_bytes, std::fs::metadata(&keep).unwrap().len());
    assert_eq!(engine.cache_size().unwrap(), report.remaining_bytes);
}

#[test]
fn test_cleanup_on_missing_root_is_noop() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let report = engine.cleanup().unwrap();
    assert_eq!(report.removed, 0);
    assert_eq!(engine.cache_size().unwrap(), 0);
}

#[test]
fn test_clear_then_render_recreates_root() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 64, 64);

    engine.render(&source, "one").unwrap();
    engine.render(&source, "two").unwrap();
    assert_eq!(cache_files(&engine), 2);

    engine.clear_cache().unwrap();
    assert!(!engine.cache().root().exists());
    assert_eq!(engine.cache_size().unwrap(), 0);

    let outcome = engine
        .render_request(&RenderRequest::new(&source, "one"))
        .unwrap();
    assert!(!outcome.cache_hit);
    assert_eq!(cache_files(&engine), 1);
}

#[test]
fn test_appearance_override_gets_own_entry() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 128, 128);

    let plain = engine.render(&source, "same").unwrap();
    let bigger = engine
        .render_request(&RenderRequest::new(&source, "same").with_font_size(40.0))
        .unwrap();
    let again = engine
        .render_request(&RenderRequest::new(&source, "same").with_font_size(40.0))
        .unwrap();

    assert_ne!(plain, bigger.path);
    assert!(again.cache_hit);
    assert_eq!(again.path, bigger.path);
}

#[test]
fn test_nul_bearing_text_never_hits_styled_entry() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 128, 128);

    let styled = engine
        .render_request(&RenderRequest::new(&source, "A").with_angle(45.0))
        .unwrap();
    let plain = engine
        .render_request(&RenderRequest::new(
            &source,
            "A\0color=ffffff;opacity=0.39215687;angle=45;grid=5x5;font_size=auto",
        ))
        .unwrap();

    assert!(!plain.cache_hit);
    assert_ne!(plain.path, styled.path);
    assert_eq!(cache_files(&engine), 2);
}
