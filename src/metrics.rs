//! Cache metrics.
//!
//! Counter collection for monitoring the cache's behaviour, reported as a
//! `BTreeMap` so the keys always come out in the same order; that keeps
//! logs, test assertions and CSV exports stable between runs.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Common reporting interface for cache implementations.
pub trait CacheMetrics {
    /// All metrics as key-value pairs, in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Name of the eviction algorithm.
    fn algorithm_name(&self) -> &'static str;
}

/// Counters tracked by the page cache.
///
/// `requests`, hit and miss counts cover `get` only; `find` is a pure
/// probe and deliberately not counted. Live memory figures are not stored
/// here; the cache injects them when reporting.
#[derive(Debug, Default, Clone)]
pub struct PageCacheMetrics {
    /// Total `get` calls.
    pub requests: u64,
    /// `get` calls answered from the primary map.
    pub cache_hits: u64,
    /// `get` calls answered by promoting a page out of the shadow.
    pub shadow_hits: u64,
    /// Pages inserted.
    pub insertions: u64,
    /// Quanta inserted over the cache's lifetime.
    pub quanta_inserted: u64,
    /// Pages removed for any reason (eviction, write-back, caller).
    pub evictions: u64,
    /// Dirty pages persisted through the writer.
    pub write_backs: u64,
    /// Log-flush requests issued by stuck eviction passes.
    pub log_flushes: u64,
    /// Eviction passes that gave up with the cache still over budget.
    pub eviction_stalls: u64,
}

impl PageCacheMetrics {
    pub(crate) fn record_hit(&mut self) {
        self.requests += 1;
        self.cache_hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.requests += 1;
    }

    pub(crate) fn record_shadow_hit(&mut self) {
        self.shadow_hits += 1;
    }

    pub(crate) fn record_insertion(&mut self, size: u64) {
        self.insertions += 1;
        self.quanta_inserted += size;
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub(crate) fn record_write_back(&mut self) {
        self.write_backs += 1;
    }

    pub(crate) fn record_log_flush(&mut self) {
        self.log_flushes += 1;
    }

    pub(crate) fn record_eviction_stall(&mut self) {
        self.eviction_stalls += 1;
    }

    /// Fraction of `get` calls served from the primary map, 0.0 when no
    /// requests have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Converts the counters to a reporting map.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            (self.requests - self.cache_hits) as f64,
        );
        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("shadow_hits".to_string(), self.shadow_hits as f64);
        metrics.insert("insertions".to_string(), self.insertions as f64);
        metrics.insert("quanta_inserted".to_string(), self.quanta_inserted as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("write_backs".to_string(), self.write_backs as f64);
        metrics.insert("log_flushes".to_string(), self.log_flushes as f64);
        metrics.insert("eviction_stalls".to_string(), self.eviction_stalls as f64);
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_without_requests_is_zero() {
        let metrics = PageCacheMetrics::default();
        assert_eq!(metrics.hit_rate(), 0.0);
    }

    #[test]
    fn test_counters_and_reporting() {
        let mut metrics = PageCacheMetrics::default();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_insertion(30);
        metrics.record_eviction();
        metrics.record_write_back();
        metrics.record_log_flush();

        let map = metrics.to_btreemap();
        assert_eq!(map["requests"], 3.0);
        assert_eq!(map["cache_hits"], 2.0);
        assert_eq!(map["cache_misses"], 1.0);
        assert_eq!(map["insertions"], 1.0);
        assert_eq!(map["quanta_inserted"], 30.0);
        assert_eq!(map["evictions"], 1.0);
        assert_eq!(map["write_backs"], 1.0);
        assert_eq!(map["log_flushes"], 1.0);
        assert!((metrics.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
