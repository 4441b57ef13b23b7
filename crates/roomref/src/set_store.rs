//
// set_store.rs
//
// TTL-bounded associative set storage shared by all service instances
//

use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// TTL-bounded set storage keyed by string, the shared substrate of the
/// room-resource index.
///
/// Every operation is atomic at single-key granularity; there is no
/// cross-key transaction and none is required — the index built on top is
/// commutative and idempotent per key. Every mutating call also refreshes
/// the key's expiry to the store's configured default, and a key whose set
/// empties out is dropped outright: an empty set carries no information and
/// must be indistinguishable from a key that never existed.
///
/// CRITICAL: an expired or never-created key reads as empty. Callers must
/// treat "empty" as "unknown, recompute", never as "definitely no relation".
#[async_trait]
pub trait AssociativeSetStore: Send + Sync {
    /// Add members to the set at `key`, creating the key if needed.
    async fn add(&self, key: &str, members: &[String]) -> Result<()>;

    /// Remove members from the set at `key`; drops the key once empty.
    async fn remove(&self, key: &str, members: &[String]) -> Result<()>;

    /// All members of the set at `key` (empty if unknown/expired).
    async fn members(&self, key: &str) -> Result<Vec<String>>;

    /// Whether `member` is in the set at `key`.
    async fn contains(&self, key: &str, member: &str) -> Result<bool>;

    /// Cardinality of the set at `key` (0 if unknown/expired).
    async fn size(&self, key: &str) -> Result<usize>;

    /// Whether `key` currently exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Reset the expiry of `key`; no-op for an unknown key.
    async fn touch(&self, key: &str, ttl: Duration) -> Result<()>;
}

#[derive(Debug)]
struct SetEntry {
    members: HashSet<String>,
    expires_at: Instant,
}

impl SetEntry {
    fn expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}

/// In-memory `AssociativeSetStore` for tests and single-process deployments.
///
/// Semantics mirror the set commands of a shared cache server: expiry is
/// per key, enforced lazily on access, and removing the last member of a
/// set drops the key. Mutations refresh the key to `default_ttl`.
#[derive(Debug)]
pub struct MemorySetStore {
    default_ttl: Duration,
    entries: DashMap<String, SetEntry>,
}

impl MemorySetStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: DashMap::new(),
        }
    }

    /// Drop `key` if its entry has expired, so expired keys read as absent.
    fn purge_if_expired(&self, key: &str) {
        self.entries.remove_if(key, |_, entry| entry.expired());
    }
}

#[async_trait]
impl AssociativeSetStore for MemorySetStore {
    async fn add(&self, key: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        self.purge_if_expired(key);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| SetEntry {
                members: HashSet::new(),
                expires_at: Instant::now() + self.default_ttl,
            });
        entry.members.extend(members.iter().cloned());
        entry.expires_at = Instant::now() + self.default_ttl;
        Ok(())
    }

    async fn remove(&self, key: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        self.purge_if_expired(key);
        if let Some(mut entry) = self.entries.get_mut(key) {
            for member in members {
                entry.members.remove(member);
            }
            entry.expires_at = Instant::now() + self.default_ttl;
        }
        // Emptied sets are dropped, not kept around as tombstones
        self.entries.remove_if(key, |_, entry| entry.members.is_empty());
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<Vec<String>> {
        self.purge_if_expired(key);
        Ok(self
            .entries
            .get(key)
            .map(|entry| entry.members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn contains(&self, key: &str, member: &str) -> Result<bool> {
        self.purge_if_expired(key);
        Ok(self
            .entries
            .get(key)
            .map(|entry| entry.members.contains(member))
            .unwrap_or(false))
    }

    async fn size(&self, key: &str) -> Result<usize> {
        self.purge_if_expired(key);
        Ok(self
            .entries
            .get(key)
            .map(|entry| entry.members.len())
            .unwrap_or(0))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.purge_if_expired(key);
        Ok(self.entries.contains_key(key))
    }

    async fn touch(&self, key: &str, ttl: Duration) -> Result<()> {
        self.purge_if_expired(key);
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = Instant::now() + ttl;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemorySetStore {
        MemorySetStore::new(Duration::from_secs(60))
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_and_members() {
        let store = store();
        store.add("k", &ids(&["a", "b"])).await.unwrap();

        let mut members = store.members("k").await.unwrap();
        members.sort();
        assert_eq!(members, ids(&["a", "b"]));
        assert!(store.contains("k", "a").await.unwrap());
        assert!(!store.contains("k", "c").await.unwrap());
        assert_eq!(store.size("k").await.unwrap(), 2);
        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let store = store();
        store.add("k", &ids(&["a"])).await.unwrap();
        store.add("k", &ids(&["a"])).await.unwrap();
        assert_eq!(store.size("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_key_reads_empty() {
        let store = store();
        assert!(store.members("missing").await.unwrap().is_empty());
        assert!(!store.contains("missing", "a").await.unwrap());
        assert_eq!(store.size("missing").await.unwrap(), 0);
        assert!(!store.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_last_member_drops_key() {
        let store = store();
        store.add("k", &ids(&["a"])).await.unwrap();
        store.remove("k", &ids(&["a"])).await.unwrap();

        assert!(!store.exists("k").await.unwrap());
        assert!(store.members("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_subset_keeps_key() {
        let store = store();
        store.add("k", &ids(&["a", "b"])).await.unwrap();
        store.remove("k", &ids(&["a"])).await.unwrap();

        assert!(store.exists("k").await.unwrap());
        assert_eq!(store.members("k").await.unwrap(), ids(&["b"]));
    }

    #[tokio::test]
    async fn test_remove_unknown_member_is_noop() {
        let store = store();
        store.add("k", &ids(&["a"])).await.unwrap();
        store.remove("k", &ids(&["z"])).await.unwrap();
        assert_eq!(store.size("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_key_reads_as_absent() {
        let store = store();
        store.add("k", &ids(&["a"])).await.unwrap();
        store.touch("k", Duration::ZERO).await.unwrap();

        assert!(!store.exists("k").await.unwrap());
        assert!(store.members("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_refreshes_expiry() {
        let store = store();
        store.add("k", &ids(&["a"])).await.unwrap();
        store.touch("k", Duration::ZERO).await.unwrap();
        // Key expired; re-adding recreates it with the default TTL
        store.add("k", &ids(&["b"])).await.unwrap();

        assert!(store.exists("k").await.unwrap());
        assert_eq!(store.members("k").await.unwrap(), ids(&["b"]));
    }

    #[tokio::test]
    async fn test_touch_unknown_key_is_noop() {
        let store = store();
        store.touch("missing", Duration::from_secs(1)).await.unwrap();
        assert!(!store.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_member_lists_are_noops() {
        let store = store();
        store.add("k", &[]).await.unwrap();
        assert!(!store.exists("k").await.unwrap());
        store.remove("k", &[]).await.unwrap();
        assert!(!store.exists("k").await.unwrap());
    }
}
