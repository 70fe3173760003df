use std::sync::atomic::{AtomicU64, Ordering};

/// Access statistics for a single cache partition.
///
/// A lookup that finds a populated cell is a hit; a lookup that has to run
/// the factory is a miss. `constructions` counts factory runs that actually
/// produced a stored value, so it stays at one per name per generation even
/// when many threads miss concurrently.
///
/// All counters use `Relaxed` atomics: they are monitoring data, not
/// synchronization.
///
/// # Examples
///
/// ```
/// use tenant_options_core::CacheStats;
///
/// let stats = CacheStats::new();
/// stats.record_miss();
/// stats.record_construction();
/// stats.record_hit();
///
/// assert_eq!(stats.hits(), 1);
/// assert_eq!(stats.misses(), 1);
/// assert_eq!(stats.constructions(), 1);
/// assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
/// ```
#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    constructions: AtomicU64,
}

impl CacheStats {
    /// Creates a new `CacheStats` instance with zero counters.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            constructions: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a factory run whose value was stored in the partition.
    #[inline]
    pub fn record_construction(&self) {
        self.constructions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn constructions(&self) -> u64 {
        self.constructions.load(Ordering::Relaxed)
    }

    /// Returns hits + misses.
    #[inline]
    pub fn total_accesses(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Returns the hit ratio in `0.0..=1.0`, or `0.0` before any access.
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    /// Resets every counter to zero.
    ///
    /// Cached values are untouched; only the bookkeeping restarts.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.constructions.store(0, Ordering::Relaxed);
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            hits: AtomicU64::new(self.hits()),
            misses: AtomicU64::new(self.misses()),
            constructions: AtomicU64::new(self.constructions()),
        }
    }
}
