// Render coalescing
//
// Deduplicates concurrent renders of the same cache key.
// When several callers miss the cache for one key at the same time:
// - First caller (leader): renders, stores the artifact, signals completion
// - Later callers (followers): block until the leader is done, then re-check the cache
//
// Rendering is synchronous CPU work, so the coordination uses blocking
// primitives rather than async channels.

use crate::cache::CacheKey;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Completion flag shared between a leader and its followers
#[derive(Debug, Default)]
struct Flight {
    done: Mutex<bool>,
    signal: Condvar,
}

impl Flight {
    fn finish(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.signal.notify_all();
    }

    fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.signal.wait(&mut done);
        }
    }
}

/// Tracks in-flight renders and makes concurrent callers for one key wait
/// on a single leader.
#[derive(Debug, Clone, Default)]
pub struct RenderCoalescer {
    in_flight: Arc<Mutex<HashMap<String, Arc<Flight>>>>,
}

impl RenderCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a coalescing slot for `key`.
    ///
    /// Returns `CoalescingSlot::Leader` if no render for the key is running.
    /// The leader renders and stores, then drops the guard.
    ///
    /// Otherwise blocks until the running render finishes and returns
    /// `CoalescingSlot::Follower`; the artifact should now be in the cache.
    pub fn acquire(&self, key: &CacheKey) -> CoalescingSlot {
        let flight = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(key.as_str()) {
                Some(flight) => Arc::clone(flight),
                None => {
                    let flight = Arc::new(Flight::default());
                    in_flight.insert(key.as_str().to_string(), Arc::clone(&flight));
                    return CoalescingSlot::Leader(LeaderGuard {
                        key: key.as_str().to_string(),
                        coalescer: self.clone(),
                        flight,
                    });
                }
            }
        };

        flight.wait();
        CoalescingSlot::Follower
    }

    /// Number of renders currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn remove_in_flight(&self, key: &str) {
        self.in_flight.lock().remove(key);
    }
}

/// Result of acquiring a coalescing slot
#[derive(Debug)]
pub enum CoalescingSlot {
    /// First caller for the key. Followers are released when the guard drops.
    Leader(LeaderGuard),

    /// A leader finished while this caller waited.
    Follower,
}

impl CoalescingSlot {
    pub fn is_leader(&self) -> bool {
        matches!(self, CoalescingSlot::Leader(_))
    }

    pub fn is_follower(&self) -> bool {
        matches!(self, CoalescingSlot::Follower)
    }
}

/// Guard held by the leader render.
/// Dropping it, on success or failure, releases every waiting follower.
#[derive(Debug)]
pub struct LeaderGuard {
    key: String,
    coalescer: RenderCoalescer,
    flight: Arc<Flight>,
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        // Unregister first so a follower that wakes and misses again can lead.
        self.coalescer.remove_in_flight(&self.key);
        self.flight.finish();
    }
}
