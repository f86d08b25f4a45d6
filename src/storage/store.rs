use crate::core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A member together with the score that orders it inside a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

impl ScoredMember {
    pub fn new(member: impl Into<String>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// Ordered-set key/value store contract - the only interface used to persist
/// and read adjacency lists and cached second-degree sets.
///
/// Members of a key are returned ordered by score, ties broken by member.
/// Implementations must give at least eventual read-after-write visibility for
/// a single key.
#[async_trait]
pub trait OrderedSetStore: Send + Sync {
    /// Inserts `member` under `key`, or updates its score when already present.
    async fn add_ordered_member(&self, key: &str, member: &str, score: f64) -> Result<()>;

    /// Returns every member stored under `key`, in score order.
    ///
    /// A missing or expired key reads as an empty sequence.
    async fn range_all(&self, key: &str) -> Result<Vec<String>>;

    /// Sets an absolute expiration `ttl` from now. No-op for missing keys.
    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Drops `key` entirely. Returns true when something was removed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Overwrites `key` wholesale with `members`, optionally expiring it.
    ///
    /// The default composes the primitive operations and is therefore not
    /// atomic; stores that can do better should override it.
    async fn replace(
        &self,
        key: &str,
        members: &[ScoredMember],
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.remove(key).await?;
        for entry in members {
            self.add_ordered_member(key, &entry.member, entry.score)
                .await?;
        }
        if let Some(ttl) = ttl {
            self.set_expiry(key, ttl).await?;
        }
        Ok(())
    }
}
