//! Short-lived memo of provider availability.
//!
//! Each entry records the verdict and the instant it was taken, according to
//! the cache's [`Clock`]. Freshness is decided at read time by comparing that
//! instant with the TTL, so expiry needs no timer and tests can drive it with
//! a [`ManualClock`](crate::clock::ManualClock).
//!
//! [`clear()`](HealthCache::clear) starts a new generation. A verdict taken
//! before the clear and written after it is discarded, so the next lookup
//! still misses.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::sync::Cache;

use crate::clock::Clock;

#[derive(Debug, Clone, Copy)]
struct HealthEntry {
    healthy: bool,
    checked_at: Instant,
}

/// Provider-name-keyed health cache with read-time TTL.
///
/// Bounded (moka LRU) so a process that registers many short-lived provider
/// names does not grow without limit.
pub struct HealthCache {
    entries: Cache<String, HealthEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    generation: AtomicU64,
}

impl HealthCache {
    pub fn new(ttl: Duration, max_entries: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::new(max_entries),
            ttl,
            clock,
            generation: AtomicU64::new(0),
        }
    }

    /// Verdict for `provider` if it was recorded less than `ttl` ago.
    pub fn fresh(&self, provider: &str) -> Option<bool> {
        let entry = self.entries.get(provider)?;
        let age = self.clock.now().saturating_duration_since(entry.checked_at);
        (age < self.ttl).then_some(entry.healthy)
    }

    /// Current generation; advanced by every [`clear()`](Self::clear).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn record(&self, provider: &str, healthy: bool) {
        self.entries.insert(
            provider.to_string(),
            HealthEntry {
                healthy,
                checked_at: self.clock.now(),
            },
        );
    }

    /// Record a verdict taken during `generation`.
    ///
    /// Returns `false` and leaves no entry behind if the cache was cleared
    /// since then.
    pub fn record_in(&self, generation: u64, provider: &str, healthy: bool) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.record(provider, healthy);
        // A clear that slipped in between the check and the insert.
        if self.generation() != generation {
            self.entries.invalidate(provider);
            return false;
        }
        true
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(clock: &Arc<ManualClock>) -> HealthCache {
        HealthCache::new(Duration::from_secs(5), 100, clock.clone())
    }

    #[test]
    fn miss_when_never_recorded() {
        let clock = Arc::new(ManualClock::new());
        assert_eq!(cache(&clock).fresh("openai"), None);
    }

    #[test]
    fn fresh_within_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache(&clock);
        cache.record("openai", false);
        clock.advance(Duration::from_millis(4_999));
        assert_eq!(cache.fresh("openai"), Some(false));
    }

    #[test]
    fn stale_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache(&clock);
        cache.record("openai", true);
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.fresh("openai"), None);
    }

    #[test]
    fn clear_drops_everything() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache(&clock);
        cache.record("a", true);
        cache.record("b", true);
        cache.clear();
        assert!(cache.fresh("a").is_none());
        assert!(cache.fresh("b").is_none());
    }

    #[test]
    fn verdict_from_before_clear_is_discarded() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache(&clock);
        let generation = cache.generation();
        cache.clear();
        assert!(!cache.record_in(generation, "a", true));
        assert!(cache.fresh("a").is_none());

        assert!(cache.record_in(cache.generation(), "a", true));
        assert_eq!(cache.fresh("a"), Some(true));
    }
}
