// Concurrent render integration tests
//
// Many threads rendering the same (path, text) pair must all succeed and
// agree on one cache file, with or without render coalescing.

use super::test_harness::*;
use image::GenericImageView;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn render_concurrently(coalesce: bool) {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(engine_with(&dir, |config| config.coalesce_renders = coalesce));
    let source = write_jpeg(&dir, "photo.jpg", 400, 300);

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let source = source.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.render(&source, "SHARED")
            })
        })
        .collect();

    let paths: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    assert!(paths.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(cache_files(&engine), 1);

    let decoded = decode(&paths[0]);
    assert_eq!(decoded.dimensions(), (400, 300));
}

#[test]
fn test_concurrent_identical_renders_without_coalescing() {
    render_concurrently(false);
}

#[test]
fn test_concurrent_identical_renders_with_coalescing() {
    render_concurrently(true);
}

#[test]
fn test_concurrent_distinct_renders() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(engine_with(&dir, |config| config.coalesce_renders = true));
    let source = write_jpeg(&dir, "photo.jpg", 200, 150);

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let source = source.clone();
            thread::spawn(move || engine.render(&source, &format!("user-{}", i)))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(cache_files(&engine), 6);
}
