//! Endpoint resolution cache
//!
//! Memoizes the data-plane endpoint of a configuration store (or one of its
//! replicas) so repeated lookups of the same store skip the management API.
//!
//! Each key owns an async mutex guarding its entry. The table of per-key
//! mutexes is a sharded `DashMap`, whose shard locks are held only while a
//! key's mutex is fetched or lazily created, never across an entry read or
//! write. Callers touching distinct keys therefore never wait on each other,
//! while a caller holding a key's [`CacheSlot`] excludes every other access
//! to that key, which is what keeps at most one resolution in flight per key.
//!
//! Per-key mutexes are never pruned; `remove` clears the entry, not the lock.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Case-insensitive cache key: `{name}` or `{name}-{replica}`, lowercased
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// An empty `replica` addresses the primary store
    pub fn new(name: &str, replica: &str) -> Self {
        if replica.is_empty() {
            Self(name.to_lowercase())
        } else {
            Self(format!("{}-{}", name, replica).to_lowercase())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved location of a configuration store's data plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDetails {
    /// Management-plane ID of the configuration store
    pub configuration_store_id: String,
    /// Set when the endpoint belongs to a replica
    pub replica_name: Option<String>,
    pub data_plane_endpoint: String,
}

/// Exclusive access to one key's entry, held for as long as the slot lives
pub struct CacheSlot {
    key: CacheKey,
    guard: OwnedMutexGuard<Option<StoreDetails>>,
}

impl CacheSlot {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn get(&self) -> Option<&StoreDetails> {
        self.guard.as_ref()
    }

    pub fn set(&mut self, details: StoreDetails) {
        debug!("caching endpoint {} for {}", details.data_plane_endpoint, self.key);
        *self.guard = Some(details);
    }

    pub fn clear(&mut self) {
        *self.guard = None;
    }
}

/// Injectable endpoint cache
#[async_trait]
pub trait EndpointCache: Send + Sync {
    /// Entry for `key`; waits only while another caller holds the same key
    async fn lookup(&self, key: &CacheKey) -> Option<StoreDetails>;

    /// Store `details` under `key`, replacing any previous entry
    async fn insert(&self, key: &CacheKey, details: StoreDetails);

    /// Drop the entry for `key`
    async fn remove(&self, key: &CacheKey);

    /// Take exclusive access to `key` until the returned slot is dropped
    async fn slot(&self, key: &CacheKey) -> CacheSlot;
}

/// `EndpointCache` with one async mutex per key
#[derive(Default)]
pub struct KeyedEndpointCache {
    slots: DashMap<CacheKey, Arc<Mutex<Option<StoreDetails>>>>,
}

impl KeyedEndpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<Mutex<Option<StoreDetails>>> {
        // The shard guard returned by `entry` is released at the end of this
        // statement, before anyone awaits the per-key mutex.
        self.slots.entry(key.clone()).or_default().value().clone()
    }

    /// Number of per-key locks created so far
    pub fn lock_count(&self) -> usize {
        self.slots.len()
    }
}

#[async_trait]
impl EndpointCache for KeyedEndpointCache {
    async fn lookup(&self, key: &CacheKey) -> Option<StoreDetails> {
        let entry = self.lock_for(key).lock().await.clone();
        debug!(
            "endpoint cache {} for {}",
            if entry.is_some() { "hit" } else { "miss" },
            key
        );
        entry
    }

    async fn insert(&self, key: &CacheKey, details: StoreDetails) {
        self.slot(key).await.set(details);
    }

    async fn remove(&self, key: &CacheKey) {
        info!("removing {} from the endpoint cache", key);
        self.slot(key).await.clear();
    }

    async fn slot(&self, key: &CacheKey) -> CacheSlot {
        let guard = self.lock_for(key).lock_owned().await;
        CacheSlot {
            key: key.clone(),
            guard,
        }
    }
}
