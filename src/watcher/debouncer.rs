//! Coalescing of bursts of change events.
//!
//! Debouncing prevents excessive re-indexing when a tree is written to many
//! times in quick succession (e.g., a checkout, a build, an editor save).

use std::hash::Hash;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

/// A key is flushed after at most this many quiet periods even if it never
/// goes quiet.
const MAX_WAIT_FACTOR: u32 = 10;

#[derive(Debug, Clone, Copy)]
struct Pending {
    first_change: Instant,
    last_change: Instant,
}

/// Debounces change events by key.
///
/// Records change timestamps and returns keys that have been quiet
/// for the configured duration, in the order they were first recorded.
/// A key that keeps changing is still returned once `max_wait` has passed
/// since its first recorded change.
#[derive(Debug)]
pub struct Debouncer<K> {
    /// Pending changes, in first-seen order.
    pending: IndexMap<K, Pending>,
    /// How long a key must be quiet before processing.
    duration: Duration,
    /// Upper bound on how long a key can stay pending.
    max_wait: Duration,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        let duration = Duration::from_millis(debounce_ms);
        Self {
            pending: IndexMap::new(),
            duration,
            max_wait: duration * MAX_WAIT_FACTOR,
        }
    }

    /// Record a change event.
    ///
    /// Resets the debounce timer for this key but keeps its queue position
    /// and its max-wait deadline.
    pub fn record(&mut self, key: K) {
        let now = Instant::now();
        self.pending
            .entry(key)
            .and_modify(|p| p.last_change = now)
            .or_insert(Pending {
                first_change: now,
                last_change: now,
            });
    }

    /// Take all keys that have been quiet for the debounce duration or have
    /// waited longer than `max_wait`.
    pub fn take_ready(&mut self) -> Vec<K> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|key, p| {
            let quiet = now.duration_since(p.last_change) >= self.duration;
            let overdue = now.duration_since(p.first_change) >= self.max_wait;
            if quiet || overdue {
                ready.push(key.clone());
                false
            } else {
                true
            }
        });

        ready
    }

    /// Take everything still pending, regardless of age.
    pub fn drain(&mut self) -> Vec<K> {
        self.pending.drain(..).map(|(key, _)| key).collect()
    }

    /// Check if there are any pending changes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    #[allow(dead_code)]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_debouncer_basic() {
        let mut debouncer = Debouncer::new(50);

        debouncer.record("docs".to_string());

        // Immediately after, nothing should be ready
        assert!(debouncer.take_ready().is_empty());
        assert!(debouncer.has_pending());

        sleep(Duration::from_millis(60));

        let ready = debouncer.take_ready();
        assert_eq!(ready, vec!["docs".to_string()]);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_debouncer_resets_on_new_change() {
        let mut debouncer = Debouncer::new(50);

        debouncer.record("docs");
        sleep(Duration::from_millis(30));

        // Record again - should reset the timer
        debouncer.record("docs");
        sleep(Duration::from_millis(30));

        // 60ms from first, only 30ms from second
        assert!(debouncer.take_ready().is_empty());

        sleep(Duration::from_millis(30));
        assert_eq!(debouncer.take_ready(), vec!["docs"]);
    }

    #[test]
    fn test_burst_collapses_to_one_key() {
        let mut debouncer = Debouncer::new(10);
        for _ in 0..25 {
            debouncer.record("api");
        }
        assert_eq!(debouncer.pending_count(), 1);

        sleep(Duration::from_millis(20));
        assert_eq!(debouncer.take_ready(), vec!["api"]);
    }

    #[test]
    fn test_ready_keys_keep_first_seen_order() {
        let mut debouncer = Debouncer::new(0);
        debouncer.record("b");
        debouncer.record("a");
        debouncer.record("c");
        debouncer.record("b");

        assert_eq!(debouncer.take_ready(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_drain_ignores_quiet_period() {
        let mut debouncer = Debouncer::new(10_000);
        debouncer.record("x");
        debouncer.record("y");

        assert!(debouncer.take_ready().is_empty());
        assert_eq!(debouncer.drain(), vec!["x", "y"]);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_constant_churn_is_flushed_after_max_wait() {
        let mut debouncer = Debouncer::new(20);
        debouncer.record("busy");

        // Keep touching the key more often than the quiet period.
        let mut flushed = Vec::new();
        for _ in 0..40 {
            sleep(Duration::from_millis(10));
            debouncer.record("busy");
            flushed.extend(debouncer.take_ready());
            if !flushed.is_empty() {
                break;
            }
        }

        // Never quiet for 20ms, so only the 200ms cap can release it.
        assert_eq!(flushed, vec!["busy"]);
    }
}
