// Cache sweeper integration tests
//
// The periodic cleanup task runs independently of render calls:
// - It deletes expired artifacts on its own schedule
// - Renders keep working while it runs
// - It stops cleanly on shutdown

use super::test_harness::*;
use inkstamp::cache::CacheSweeper;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_sweeper_removes_expired_artifacts() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir);
    let source = write_jpeg(&dir, "photo.jpg", 96, 96);

    let fresh = engine.render(&source, "fresh").unwrap();
    let stale = engine.render(&source, "stale").unwrap();
    age_file(&stale, Duration::from_secs(2 * 24 * 60 * 60));

    let sweeper = CacheSweeper::new(Arc::clone(engine.cache()), Duration::from_millis(25));
    sweeper.start();

    assert!(wait_until(|| !stale.exists()).await, "stale entry survived");
    assert!(fresh.exists());

    sweeper.shutdown().await;
    assert!(!sweeper.is_running());
}

#[tokio::test]
async fn test_renders_continue_while_sweeping() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(engine_in(&dir));
    let source = write_jpeg(&dir, "photo.jpg", 128, 96);

    let sweeper = CacheSweeper::new(Arc::clone(engine.cache()), Duration::from_millis(5));
    sweeper.start();

    let mut handles = Vec::new();
    for i in 0..4 {
        let engine = Arc::clone(&engine);
        let source = source.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            (0..5)
                .map(|j| engine.render(&source, &format!("mark {} {}", i, j)))
                .collect::<Result<Vec<_>, _>>()
        }));
    }
    for handle in handles {
        let paths = handle.await.unwrap().unwrap();
        assert_eq!(paths.len(), 5);
    }

    sweeper.shutdown().await;
    // Nothing was old enough to be swept.
    assert_eq!(cache_files(&engine), 20);
}

#[tokio::test]
async fn test_engine_sweeper_has_configured_identity() {
    let dir = TempDir::new().unwrap();
    let engine = engine_with(&dir, |config| config.cache.sweep_interval_seconds = 90);
    let sweeper = engine.sweeper();
    assert_eq!(sweeper.name(), "WatermarkCacheCleanup");
    assert_eq!(sweeper.interval(), Duration::from_secs(90));

    sweeper.start();
    assert!(sweeper.is_running());
    sweeper.stop();
    assert!(!sweeper.is_running());
}
