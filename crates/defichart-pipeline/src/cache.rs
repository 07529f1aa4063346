//! Memoisation of chart outputs keyed by a hash of the full request.

use defichart_common::{Granularity, Result};
use defichart_config::CacheSettings;
use moka::sync::Cache;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::types::ChartOutput;

/// Cache key: the request's grouping and denomination plus a hash of everything else.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    /// Requested granularity.
    pub group_by: Granularity,
    /// Requested denomination, `None` for USD.
    pub denomination: Option<String>,
    /// Hash of the serialized request.
    pub params_hash: u64,
}

impl CacheKey {
    /// Creates a key without a parameters hash.
    pub fn new(group_by: Granularity, denomination: Option<String>) -> Self {
        Self {
            group_by,
            denomination,
            params_hash: 0,
        }
    }

    /// Adds a hash of `params`' JSON serialization.
    ///
    /// JSON is hashed rather than the value itself because requests carry
    /// floating point values, which are not `Hash`.
    pub fn with_params_hash(mut self, params: &impl Serialize) -> Result<Self> {
        let bytes = serde_json::to_vec(params)?;
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        self.params_hash = hasher.finish();
        Ok(self)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.group_by)?;
        if let Some(denomination) = &self.denomination {
            write!(f, "{denomination}:")?;
        }
        write!(f, "hash_{}", self.params_hash)
    }
}

/// Hit and miss counters.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Lookups answered from the cache.
    pub hits: AtomicU64,
    /// Lookups that had to compute.
    pub misses: AtomicU64,
}

impl CacheMetrics {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Share of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let total = hits + self.misses.load(Ordering::Relaxed) as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Bounded, TTL-based cache of chart outputs. Cheap to clone; clones share storage.
#[derive(Clone)]
pub struct ChartCache {
    cache: Cache<CacheKey, Arc<ChartOutput>>,
    metrics: Arc<CacheMetrics>,
}

impl ChartCache {
    /// Creates a cache sized by `settings`.
    pub fn new(settings: &CacheSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.max_capacity)
            .time_to_live(Duration::from_secs(settings.ttl_secs))
            .build();

        Self {
            cache,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    /// Cached output for `key`, if present.
    #[instrument(skip(self), fields(key = %key))]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<ChartOutput>> {
        if let Some(output) = self.cache.get(key) {
            debug!("Cache hit");
            self.metrics.record_hit();
            Some(output)
        } else {
            debug!("Cache miss");
            self.metrics.record_miss();
            None
        }
    }

    /// Stores an output.
    pub fn insert(&self, key: CacheKey, output: Arc<ChartOutput>) {
        self.cache.insert(key, output);
    }

    /// Returns the cached output for `key` or computes and stores it.
    pub fn get_or_compute(&self, key: CacheKey, compute: impl FnOnce() -> ChartOutput) -> Arc<ChartOutput> {
        if let Some(output) = self.get(&key) {
            return output;
        }
        let output = Arc::new(compute());
        self.insert(key, Arc::clone(&output));
        output
    }

    /// Drops every cached output.
    pub fn invalidate_all(&self) {
        info!(entries = self.cache.entry_count(), "Invalidating chart cache");
        self.cache.invalidate_all();
    }

    /// Shared counters.
    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl fmt::Debug for ChartCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartCache")
            .field("entries", &self.cache.entry_count())
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChartDataset;
    use std::collections::BTreeMap;

    fn output(symbol: &str) -> ChartOutput {
        ChartOutput {
            dataset: ChartDataset::empty(),
            stack_colors: BTreeMap::new(),
            value_symbol: symbol.to_string(),
            group_by: Granularity::Daily,
            denomination_applied: false,
        }
    }

    #[test]
    fn test_key_hash_depends_on_params() {
        let a = CacheKey::new(Granularity::Weekly, None)
            .with_params_hash(&serde_json::json!({ "cap": 10 }))
            .unwrap();
        let b = CacheKey::new(Granularity::Weekly, None)
            .with_params_hash(&serde_json::json!({ "cap": 10 }))
            .unwrap();
        let c = CacheKey::new(Granularity::Weekly, None)
            .with_params_hash(&serde_json::json!({ "cap": 11 }))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.to_string().starts_with("weekly:hash_"));
    }

    #[test]
    fn test_get_or_compute_memoises() {
        let cache = ChartCache::new(&CacheSettings::default());
        let key = CacheKey::new(Granularity::Daily, Some("ETH".to_string()));

        let mut calls = 0;
        let first = cache.get_or_compute(key.clone(), || {
            calls += 1;
            output("ETH")
        });
        let second = cache.get_or_compute(key, || {
            calls += 1;
            output("ETH")
        });

        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
        let metrics = cache.metrics();
        assert_eq!(metrics.hits.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.misses.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.hit_rate(), 0.5);
    }

    #[test]
    fn test_invalidate_all() {
        let cache = ChartCache::new(&CacheSettings::default());
        let key = CacheKey::new(Granularity::Daily, None);
        cache.insert(key.clone(), Arc::new(output("$")));
        cache.invalidate_all();
        assert!(cache.get(&key).is_none());
    }
}
