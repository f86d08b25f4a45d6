use super::persistence::{SetSnapshot, StoreSnapshot};
use super::store::{OrderedSetStore, ScoredMember};
use crate::core::{GraphError, Result};
use async_trait::async_trait;
use chrono::Utc;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Level, event};

#[derive(Debug, Clone, Default)]
struct OrderedSet {
    scores: HashMap<String, f64>,
    expires_at: Option<Instant>,
}

impl OrderedSet {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn ordered(&self) -> Vec<(&String, f64)> {
        let mut entries: Vec<(&String, f64)> =
            self.scores.iter().map(|(member, score)| (member, *score)).collect();
        entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

/// Process-local ordered-set store with per-key TTL.
///
/// Stands in for an external ordered-set server. Expired keys are invisible to
/// reads and purged lazily on access. An optional capacity bounds the number
/// of keys; the least recently used key is evicted first.
pub struct InMemoryOrderedSetStore {
    name: String,
    sets: Mutex<LruCache<String, OrderedSet>>,
}

impl InMemoryOrderedSetStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sets: Mutex::new(LruCache::unbounded()),
        }
    }

    pub fn with_capacity(name: impl Into<String>, capacity: NonZeroUsize) -> Self {
        Self {
            name: name.into(),
            sets: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of live (non-expired) keys.
    pub fn key_count(&self) -> Result<usize> {
        let now = Instant::now();
        let sets = self.sets.lock()?;
        Ok(sets.iter().filter(|(_, set)| !set.is_expired(now)).count())
    }

    /// Captures every live key with its remaining TTL as a wall-clock deadline.
    pub fn export(&self) -> Result<StoreSnapshot> {
        let now = Instant::now();
        let wall_now = Utc::now();
        let sets = self.sets.lock()?;
        let mut snapshot = StoreSnapshot::default();
        for (key, set) in sets.iter() {
            if set.is_expired(now) {
                continue;
            }
            let expires_at = match set.expires_at {
                Some(at) => {
                    let remaining = chrono::Duration::from_std(at.saturating_duration_since(now))
                        .map_err(|err| GraphError::Snapshot(err.to_string()))?;
                    Some(wall_now + remaining)
                }
                None => None,
            };
            let members = set
                .ordered()
                .into_iter()
                .map(|(member, score)| ScoredMember::new(member.clone(), score))
                .collect();
            snapshot
                .sets
                .insert(key.clone(), SetSnapshot { members, expires_at });
        }
        Ok(snapshot)
    }

    /// Loads a snapshot on top of the current contents.
    ///
    /// Keys whose deadline already passed are skipped.
    pub fn import(&self, snapshot: StoreSnapshot) -> Result<usize> {
        let now = Instant::now();
        let wall_now = Utc::now();
        let mut sets = self.sets.lock()?;
        let mut loaded = 0;
        for (key, set) in snapshot.sets {
            let expires_at = match set.expires_at {
                Some(deadline) => match (deadline - wall_now).to_std() {
                    Ok(remaining) if !remaining.is_zero() => Some(now + remaining),
                    _ => continue,
                },
                None => None,
            };
            let scores = set
                .members
                .into_iter()
                .map(|entry| (entry.member, entry.score))
                .collect();
            sets.put(key, OrderedSet { scores, expires_at });
            loaded += 1;
        }
        event!(Level::DEBUG, store = %self.name, keys = loaded, "snapshot imported");
        Ok(loaded)
    }
}

#[async_trait]
impl OrderedSetStore for InMemoryOrderedSetStore {
    async fn add_ordered_member(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let now = Instant::now();
        let mut sets = self.sets.lock()?;
        let set = sets.get_or_insert_mut(key.to_string(), OrderedSet::default);
        if set.is_expired(now) {
            *set = OrderedSet::default();
        }
        set.scores.insert(member.to_string(), score);
        Ok(())
    }

    async fn range_all(&self, key: &str) -> Result<Vec<String>> {
        let now = Instant::now();
        let mut sets = self.sets.lock()?;
        let expired = match sets.get(key) {
            Some(set) if set.is_expired(now) => true,
            Some(set) => {
                return Ok(set
                    .ordered()
                    .into_iter()
                    .map(|(member, _)| member.clone())
                    .collect());
            }
            None => return Ok(Vec::new()),
        };
        if expired {
            sets.pop(key);
        }
        Ok(Vec::new())
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut sets = self.sets.lock()?;
        if let Some(set) = sets.get_mut(key)
            && !set.is_expired(now)
        {
            set.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut sets = self.sets.lock()?;
        Ok(sets.pop(key).is_some_and(|set| !set.is_expired(now)))
    }

    async fn replace(
        &self,
        key: &str,
        members: &[ScoredMember],
        ttl: Option<Duration>,
    ) -> Result<()> {
        let now = Instant::now();
        let mut sets = self.sets.lock()?;
        if members.is_empty() {
            sets.pop(key);
            return Ok(());
        }
        let scores = members
            .iter()
            .map(|entry| (entry.member.clone(), entry.score))
            .collect();
        sets.put(
            key.to_string(),
            OrderedSet {
                scores,
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn range_all_orders_by_score_then_member() {
        let store = InMemoryOrderedSetStore::new("mem");
        store.add_ordered_member("k", "30", 30.0).await.unwrap();
        store.add_ordered_member("k", "10", 10.0).await.unwrap();
        store.add_ordered_member("k", "b", 20.0).await.unwrap();
        store.add_ordered_member("k", "a", 20.0).await.unwrap();

        assert_eq!(store.range_all("k").await.unwrap(), vec!["10", "a", "b", "30"]);
        assert!(store.range_all("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn re_adding_a_member_keeps_a_single_entry() {
        let store = InMemoryOrderedSetStore::new("mem");
        store.add_ordered_member("k", "x", 5.0).await.unwrap();
        store.add_ordered_member("k", "y", 3.0).await.unwrap();
        store.add_ordered_member("k", "x", 1.0).await.unwrap();

        assert_eq!(store.range_all("k").await.unwrap(), vec!["x", "y"]);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_keys_read_as_empty() {
        let store = InMemoryOrderedSetStore::new("mem");
        store.add_ordered_member("k", "1", 1.0).await.unwrap();
        store.set_expiry("k", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.range_all("k").await.unwrap(), vec!["1"]);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.range_all("k").await.unwrap().is_empty());
        assert_eq!(store.key_count().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn adding_to_an_expired_key_starts_a_fresh_set() {
        let store = InMemoryOrderedSetStore::new("mem");
        store.add_ordered_member("k", "old", 1.0).await.unwrap();
        store.set_expiry("k", Duration::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        store.add_ordered_member("k", "new", 2.0).await.unwrap();
        assert_eq!(store.range_all("k").await.unwrap(), vec!["new"]);
    }

    #[tokio::test]
    async fn replace_overwrites_instead_of_merging() {
        let store = InMemoryOrderedSetStore::new("mem");
        store.add_ordered_member("k", "1", 1.0).await.unwrap();
        store.add_ordered_member("k", "2", 2.0).await.unwrap();

        store
            .replace("k", &[ScoredMember::new("3", 3.0)], None)
            .await
            .unwrap();
        assert_eq!(store.range_all("k").await.unwrap(), vec!["3"]);

        store.replace("k", &[], None).await.unwrap();
        assert!(store.range_all("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bounded_store_evicts_least_recently_used_key() {
        let store = InMemoryOrderedSetStore::with_capacity("mem", NonZeroUsize::new(2).unwrap());
        store.add_ordered_member("a", "1", 1.0).await.unwrap();
        store.add_ordered_member("b", "1", 1.0).await.unwrap();
        store.range_all("a").await.unwrap();
        store.add_ordered_member("c", "1", 1.0).await.unwrap();

        assert_eq!(store.range_all("a").await.unwrap(), vec!["1"]);
        assert!(store.range_all("b").await.unwrap().is_empty());
        assert_eq!(store.key_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn export_then_import_preserves_order_and_ttl() {
        let source = InMemoryOrderedSetStore::new("mem");
        source.add_ordered_member("plain", "2", 2.0).await.unwrap();
        source.add_ordered_member("plain", "1", 1.0).await.unwrap();
        source.add_ordered_member("ttl", "9", 9.0).await.unwrap();
        source
            .set_expiry("ttl", Duration::from_secs(3600))
            .await
            .unwrap();

        let snapshot = source.export().unwrap();
        assert!(snapshot.sets["plain"].expires_at.is_none());
        assert!(snapshot.sets["ttl"].expires_at.is_some());

        let target = InMemoryOrderedSetStore::new("copy");
        assert_eq!(target.import(snapshot).unwrap(), 2);
        assert_eq!(target.range_all("plain").await.unwrap(), vec!["1", "2"]);
        assert_eq!(target.range_all("ttl").await.unwrap(), vec!["9"]);
    }
}
