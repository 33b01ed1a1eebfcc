//! Key-value store handed through to the scoring collaborators.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

/// Store consulted by the scoring functions.
///
/// Implementations must tolerate concurrent use from simultaneous calls.
pub trait Store: Send + Sync {
    /// Reads a persistent value.
    fn get(&self, key: &str) -> Option<String>;

    /// Reads a cached value that has not expired.
    fn cache_get(&self, key: &str) -> Option<String>;

    /// Caches a value for `ttl`.
    fn cache_set(&self, key: &str, value: String, ttl: Duration);
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Minimum time between sweeps of expired cache entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// In-process store with expiring cache entries.
///
/// Expired entries are swept out by `cache_set`, at most once per sweep
/// interval, so a long-lived store stays bounded by its live entries.
#[derive(Debug)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    cache: RwLock<HashMap<String, Entry>>,
    sweep_interval: Duration,
    last_sweep: Mutex<Instant>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_sweep_interval(SWEEP_INTERVAL)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            values: RwLock::default(),
            cache: RwLock::default(),
            sweep_interval,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Sets a persistent value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Number of cache entries held, expired or not.
    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Claims the next sweep if the interval has elapsed.
    fn sweep_due(&self, now: Instant) -> bool {
        let mut last = self.last_sweep.lock();
        if now.saturating_duration_since(*last) >= self.sweep_interval {
            *last = now;
            true
        } else {
            false
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn cache_get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.cache
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    fn cache_set(&self, key: &str, value: String, ttl: Duration) {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now.checked_add(ttl),
        };
        let mut cache = self.cache.write();
        if self.sweep_due(now) {
            cache.retain(|_, entry| entry.is_live(now));
        }
        cache.insert(key.to_string(), entry);
    }
}
