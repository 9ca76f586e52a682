use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;

/// Minimum spacing between successful calls to the same endpoint key.
///
/// Only successful calls stamp the window; a failed call leaves the key
/// untouched so it can be retried immediately. That asymmetry mirrors the
/// upstream service contract.
#[derive(Debug)]
pub struct CooldownGuard {
    window: Duration,
    stamped: HashMap<String, Instant>,
}

impl CooldownGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stamped: HashMap::new(),
        }
    }

    /// Remaining wait for `key`, or `None` when a call may proceed.
    pub fn check(&self, key: &str, now: Instant) -> Option<Duration> {
        let stamped_at = self.stamped.get(key)?;
        let elapsed = now.saturating_duration_since(*stamped_at);
        if elapsed < self.window {
            Some(self.window - elapsed)
        } else {
            None
        }
    }

    pub fn stamp(&mut self, key: &str, now: Instant) {
        self.stamped.insert(key.to_string(), now);
    }

    /// Drop every stamp whose key embeds `needle`. Used when a node identity
    /// is (re)selected so its load wave always reaches the network.
    pub fn evict_matching(&mut self, needle: &str) {
        if needle.is_empty() {
            return;
        }
        self.stamped.retain(|key, _| !key.contains(needle));
    }
}

/// Time-based memo for low-churn, expensive lookups. Entries are whole JSON
/// payloads replaced atomically on refresh, never edited in place.
#[derive(Debug)]
pub struct TtlCache {
    entries: HashMap<String, TtlEntry>,
}

#[derive(Debug)]
struct TtlEntry {
    value: Value,
    stored_at: Instant,
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str, window: Duration, now: Instant) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.stored_at) < window {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: &str, value: Value, now: Instant) {
        self.entries.insert(
            key.to_string(),
            TtlEntry {
                value,
                stored_at: now,
            },
        );
    }

    pub fn evict_matching(&mut self, needle: &str) {
        if needle.is_empty() {
            return;
        }
        self.entries.retain(|key, _| !key.contains(needle));
    }
}

/// The injectable response store shared by the API client and the driver
/// loop. Constructed explicitly per process (or per test) — never a module
/// global.
#[derive(Debug)]
pub struct ResponseStore {
    pub cooldowns: CooldownGuard,
    pub ttl: TtlCache,
}

pub type SharedStore = Arc<Mutex<ResponseStore>>;

impl ResponseStore {
    pub fn new(cooldown_window: Duration) -> Self {
        Self {
            cooldowns: CooldownGuard::new(cooldown_window),
            ttl: TtlCache::new(),
        }
    }

    pub fn shared(cooldown_window: Duration) -> SharedStore {
        Arc::new(Mutex::new(Self::new(cooldown_window)))
    }

    pub fn evict_matching(&mut self, needle: &str) {
        self.cooldowns.evict_matching(needle);
        self.ttl.evict_matching(needle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cooldown_blocks_within_window_and_reopens_after() {
        let mut guard = CooldownGuard::new(Duration::from_secs(30));
        let t0 = Instant::now();

        assert!(guard.check("/lite/nodes/stats", t0).is_none());
        guard.stamp("/lite/nodes/stats", t0);

        let remaining = guard
            .check("/lite/nodes/stats", t0 + Duration::from_secs(10))
            .expect("second call inside the window should be gated");
        assert_eq!(remaining, Duration::from_secs(20));

        assert!(guard
            .check("/lite/nodes/stats", t0 + Duration::from_secs(30))
            .is_none());
    }

    #[test]
    fn unstamped_key_is_never_gated() {
        let guard = CooldownGuard::new(Duration::from_secs(30));
        assert!(guard.check("/claim/status/0xaa", Instant::now()).is_none());
    }

    #[test]
    fn eviction_only_touches_matching_keys() {
        let mut guard = CooldownGuard::new(Duration::from_secs(30));
        let now = Instant::now();
        guard.stamp("/metrics/check-cooldown/node-7", now);
        guard.stamp("/lite/nodes/stats", now);

        guard.evict_matching("node-7");
        assert!(guard.check("/metrics/check-cooldown/node-7", now).is_none());
        assert!(guard.check("/lite/nodes/stats", now).is_some());
    }

    #[test]
    fn empty_needle_evicts_nothing() {
        let mut guard = CooldownGuard::new(Duration::from_secs(30));
        let now = Instant::now();
        guard.stamp("/lite/nodes/stats", now);
        guard.evict_matching("");
        assert!(guard.check("/lite/nodes/stats", now).is_some());
    }

    #[test]
    fn ttl_cache_returns_fresh_entry_then_expires() {
        let mut cache = TtlCache::new();
        let t0 = Instant::now();
        let window = Duration::from_secs(300);
        cache.insert("/metrics/requirements", json!({"CORES": 4}), t0);

        assert_eq!(
            cache.get("/metrics/requirements", window, t0 + Duration::from_secs(299)),
            Some(json!({"CORES": 4}))
        );
        assert_eq!(
            cache.get("/metrics/requirements", window, t0 + Duration::from_secs(300)),
            None
        );
    }

    #[test]
    fn ttl_insert_supersedes_whole_entry() {
        let mut cache = TtlCache::new();
        let t0 = Instant::now();
        cache.insert("/metrics/requirements", json!({"CORES": 4}), t0);
        cache.insert(
            "/metrics/requirements",
            json!({"CORES": 8}),
            t0 + Duration::from_secs(1),
        );
        assert_eq!(
            cache.get(
                "/metrics/requirements",
                Duration::from_secs(300),
                t0 + Duration::from_secs(2)
            ),
            Some(json!({"CORES": 8}))
        );
    }
}
