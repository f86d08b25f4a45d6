use crate::config::{ClusterConfig, DEFAULT_CACHE_TTL};
use crate::core::{GraphError, MemberId, RequestContext, Result};
use crate::storage::{InMemoryOrderedSetStore, OrderedSetStore, ScoredMember, StoreConnector};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, event};

const SECOND_DEGREE_KEY_PREFIX: &str = "second_degree:";

// Written into every entry so an empty set still exists as a key.
const PRESENCE_MARKER: &str = "-";
const PRESENCE_SCORE: f64 = f64::MIN;

pub fn second_degree_key(source: MemberId) -> String {
    format!("{}{}", SECOND_DEGREE_KEY_PREFIX, source)
}

/// Time-bounded cache of second-degree sets, keyed by source member.
///
/// Entries are never invalidated on graph writes: a cached set may lag the
/// adjacency lists by up to one TTL. That staleness window is the price paid
/// for skipping the cover fan-out on every request.
///
/// Every entry carries a presence marker next to its members, so an empty set
/// is cached like any other and reads back as `Some(empty)`.
pub struct SecondDegreeCache {
    store: Arc<dyn OrderedSetStore>,
    ttl: Duration,
}

impl SecondDegreeCache {
    pub fn new(store: Arc<dyn OrderedSetStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn with_default_ttl(store: Arc<dyn OrderedSetStore>) -> Self {
        Self::new(store, DEFAULT_CACHE_TTL)
    }

    /// Cache described by `config`.
    ///
    /// With a `cache_capacity` the cache gets its own bounded store, so LRU
    /// eviction can never reach the adjacency stores. Otherwise it lives on
    /// the cache endpoint obtained from `connector`.
    pub fn from_config(config: &ClusterConfig, connector: &dyn StoreConnector) -> Result<Self> {
        let store: Arc<dyn OrderedSetStore> = match config.cache_capacity {
            Some(capacity) => Arc::new(InMemoryOrderedSetStore::with_capacity(
                "second-degree-cache",
                capacity,
            )),
            None => {
                let endpoint = config.effective_cache_endpoint().ok_or_else(|| {
                    GraphError::ConfigInvariantViolation(
                        "no endpoint available for the second-degree cache".to_string(),
                    )
                })?;
                connector.connect(endpoint)?
            }
        };
        Ok(Self::new(store, config.cache_ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached second-degree set of `source`.
    ///
    /// `None` on a miss and on any backing-store failure alike; both send the
    /// caller down the rebuild path. Failures are logged here.
    pub async fn get(&self, ctx: &RequestContext, source: MemberId) -> Option<BTreeSet<MemberId>> {
        match self.try_get(ctx, source).await {
            Ok(Some(members)) => Some(members),
            Ok(None) => None,
            Err(err) => {
                event!(
                    Level::WARN,
                    source = %source,
                    error = %err,
                    "second-degree cache read failed, treating as miss"
                );
                None
            }
        }
    }

    async fn try_get(
        &self,
        ctx: &RequestContext,
        source: MemberId,
    ) -> Result<Option<BTreeSet<MemberId>>> {
        let key = second_degree_key(source);
        let raw = ctx
            .call("second-degree cache read", self.store.range_all(&key))
            .await
            .map_err(|err| GraphError::CacheError(err.to_string()))?;
        if raw.is_empty() {
            return Ok(None);
        }
        let members = raw
            .iter()
            .filter(|entry| entry.as_str() != PRESENCE_MARKER)
            .map(|entry| {
                entry.parse::<MemberId>().map_err(|_| {
                    GraphError::CacheError(format!("malformed cached member '{}' under {}", entry, key))
                })
            })
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Some(members))
    }

    /// Overwrites the entry for `source` with the configured TTL.
    pub async fn put(
        &self,
        ctx: &RequestContext,
        source: MemberId,
        members: &BTreeSet<MemberId>,
    ) -> Result<()> {
        self.put_with_ttl(ctx, source, members, self.ttl).await
    }

    /// Overwrites the entry for `source`, expiring it `ttl` from now.
    ///
    /// Replaces any previous set wholesale; no merge with older members.
    pub async fn put_with_ttl(
        &self,
        ctx: &RequestContext,
        source: MemberId,
        members: &BTreeSet<MemberId>,
        ttl: Duration,
    ) -> Result<()> {
        let key = second_degree_key(source);
        let entries: Vec<ScoredMember> =
            std::iter::once(ScoredMember::new(PRESENCE_MARKER, PRESENCE_SCORE))
                .chain(
                    members
                        .iter()
                        .map(|member| ScoredMember::new(member.canonical(), member.get() as f64)),
                )
                .collect();
        ctx.call(
            "second-degree cache write",
            self.store.replace(&key, &entries, Some(ttl)),
        )
        .await
        .map_err(|err| GraphError::CacheError(err.to_string()))
    }
}
