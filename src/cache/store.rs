use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::cache::key::CacheKey;

const SHARD_COUNT: usize = 16;

// Key points:
// Serializable payloads only
// Explicit lifecycle (construct with config, clear on demand)
// No lock held across any await — all sections here are synchronous
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl CacheConfig {
    pub fn v0() -> Self {
        Self {
            ttl: Duration::minutes(15),
            capacity: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Process-wide memoization of pipeline products, sharded so hits never
/// block on unrelated in-flight misses. Last writer wins on racing inserts
/// of one key; entries are idempotent for identical input, so either write
/// is correct.
pub struct ResolutionCache {
    shards: Vec<RwLock<HashMap<CacheKey, CacheEntry>>>,
    config: CacheConfig,
}

impl ResolutionCache {
    pub fn new(config: CacheConfig) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self { shards, config }
    }

    fn shard(&self, key: &CacheKey) -> &RwLock<HashMap<CacheKey, CacheEntry>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// Fetch and decode a live entry. Expired entries behave as misses and
    /// are evicted. An undecodable payload is treated as corruption:
    /// evicted and reported as a miss, never surfaced to the caller.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let shard = self.shard(key);

        let outcome = {
            let map = shard.read().unwrap_or_else(|e| e.into_inner());
            match map.get(key) {
                None => return None,
                Some(entry) if self.expired(entry) => Lookup::Evict,
                Some(entry) => match serde_json::from_value(entry.payload.clone()) {
                    Ok(value) => Lookup::Hit(value),
                    Err(e) => {
                        warn!(key = key.as_str(), "evicting corrupt cache entry: {e}");
                        Lookup::Evict
                    }
                },
            }
        };

        match outcome {
            Lookup::Hit(value) => Some(value),
            Lookup::Evict => {
                let mut map = shard.write().unwrap_or_else(|e| e.into_inner());
                map.remove(key);
                None
            }
        }
    }

    pub fn insert<T: Serialize>(&self, key: CacheKey, value: &T) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = key.as_str(), "refusing to cache unserializable value: {e}");
                return;
            }
        };

        let shard = self.shard(&key);
        let mut map = shard.write().unwrap_or_else(|e| e.into_inner());

        // Per-shard capacity bound; evict the oldest entry when full.
        let per_shard = (self.config.capacity / SHARD_COUNT).max(1);
        if map.len() >= per_shard && !map.contains_key(&key) {
            let oldest = map
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| k.clone());
            if let Some(victim) = oldest {
                map.remove(&victim);
            }
        }

        map.insert(
            key,
            CacheEntry {
                payload,
                created_at: Utc::now(),
            },
        );
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            shard.write().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().unwrap_or_else(|e| e.into_inner()).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, entry: &CacheEntry) -> bool {
        Utc::now() - entry.created_at > self.config.ttl
    }
}

enum Lookup<T> {
    Hit(T),
    Evict,
}
