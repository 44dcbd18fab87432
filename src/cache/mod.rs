//! Versioned TTL result cache for expensive aggregations.
//!
//! Each aggregation name carries a statically configured policy (TTL and
//! schema version) injected at construction. A cached value is served
//! while it is unexpired and was stored under the currently configured
//! version; otherwise the compute function runs and its result replaces
//! the entry. Entries are tagged with the category filter used to
//! compute them so mutations can invalidate a single category.
//!
//! Concurrent lookups for different keys never interfere. Concurrent
//! lookups for the *same* key may both miss and both compute: there is
//! no single-flight lock, duplicate recomputation is an accepted cost.
//!
//! Mutation paths do not call the cache directly: they emit
//! [`InvalidationEvent`]s through a fire-and-forget channel consumed by
//! a listener task, so a failed invalidation can never fail a mutation.

pub mod request;

pub use request::RequestScope;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::models::AnalyticsFilters;

/// TTL and schema version for one aggregation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub version: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            version: 1,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    stored_at_version: u32,
    expires_at: Instant,
    category: Option<String>,
}

impl CacheEntry {
    fn is_valid(&self, policy: &CachePolicy) -> bool {
        self.stored_at_version == policy.version && Instant::now() <= self.expires_at
    }
}

/// Keyed TTL + version cache in front of the aggregation pipelines.
pub struct ResultCache {
    policies: HashMap<String, CachePolicy>,
    default_policy: CachePolicy,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    /// Create a cache with the given per-aggregation policy table.
    /// Aggregation names not in the table use the default policy.
    pub fn new(default_policy: CachePolicy, policies: HashMap<String, CachePolicy>) -> Self {
        Self {
            policies,
            default_policy,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cache with default policies for every aggregation.
    pub fn with_defaults() -> Self {
        Self::new(CachePolicy::default(), HashMap::new())
    }

    /// Replace the policy for one aggregation name. Bumping the version
    /// invalidates every entry stored under the old version.
    pub fn set_policy(&mut self, name: impl Into<String>, policy: CachePolicy) {
        self.policies.insert(name.into(), policy);
    }

    fn policy(&self, name: &str) -> &CachePolicy {
        self.policies.get(name).unwrap_or(&self.default_policy)
    }

    /// Deterministic cache key: aggregation name plus a digest of the
    /// canonical filter serialization.
    fn cache_key(name: &str, filters: &AnalyticsFilters) -> String {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(filters.canonical_key().as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("{}:{}", name, &digest[..16])
    }

    /// Serve a cached value, or compute, store and return it.
    ///
    /// A hit that fails to deserialize (stale shape from an older build)
    /// is treated as a miss.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        name: &str,
        filters: &AnalyticsFilters,
        compute: F,
    ) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let key = Self::cache_key(name, filters);
        let policy = self.policy(name);

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if entry.is_valid(policy) {
                    match serde_json::from_value(entry.value.clone()) {
                        Ok(value) => {
                            debug!(aggregation = name, "cache hit");
                            return value;
                        }
                        Err(err) => {
                            warn!(aggregation = name, %err, "cached value unreadable, recomputing");
                        }
                    }
                }
            }
        }

        debug!(aggregation = name, "cache miss, computing");
        let value = compute().await;

        match serde_json::to_value(&value) {
            Ok(serialized) => {
                let entry = CacheEntry {
                    value: serialized,
                    stored_at_version: policy.version,
                    expires_at: Instant::now() + policy.ttl,
                    category: filters.category.clone(),
                };
                self.entries.write().await.insert(key, entry);
            }
            Err(err) => {
                // Serve the computed value anyway; it just is not cached.
                warn!(aggregation = name, %err, "failed to serialize value for cache");
            }
        }

        value
    }

    /// Forcibly expire entries. With a category, only entries computed
    /// under that category filter are removed; without, everything goes.
    pub async fn invalidate(&self, category: Option<&str>) {
        let mut entries = self.entries.write().await;
        match category {
            Some(category) => {
                entries.retain(|_, entry| entry.category.as_deref() != Some(category));
            }
            None => entries.clear(),
        }
        debug!(?category, remaining = entries.len(), "cache invalidated");
    }

    /// Number of live entries (instrumentation).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// A cache invalidation request emitted by the mutation path.
#[derive(Debug, Clone)]
pub struct InvalidationEvent {
    /// Category whose entries should be dropped; `None` clears all.
    pub category: Option<String>,
}

/// Fire-and-forget sender side of the invalidation channel. Held by the
/// mutation path; sending never blocks and never fails the caller.
#[derive(Clone)]
pub struct InvalidationSender {
    tx: mpsc::UnboundedSender<InvalidationEvent>,
}

impl InvalidationSender {
    /// Emit an invalidation event. Best-effort: if the listener is gone
    /// the event is dropped and the mutation proceeds regardless.
    pub fn send(&self, category: Option<String>) {
        if self.tx.send(InvalidationEvent { category }).is_err() {
            debug!("invalidation listener gone, event dropped");
        }
    }

    /// A sender with no listener; every event is dropped. Used where no
    /// cache is wired up.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }
}

/// Spawn the listener task that applies invalidation events to a cache
/// and return the sender for the mutation path.
pub fn spawn_invalidation_listener(cache: Arc<ResultCache>) -> InvalidationSender {
    let (tx, mut rx) = mpsc::unbounded_channel::<InvalidationEvent>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            cache.invalidate(event.category.as_deref()).await;
        }
    });
    InvalidationSender { tx }
}
