use super::cache::SecondDegreeCache;
use super::stats::{ResolverStats, ResolverStatsSnapshot};
use crate::cluster::{ClusterTopology, CoverSelection, find_minimum_node_set};
use crate::core::{
    BestEffort, Connection, Distance, GraphDistance, GraphError, MemberId, RequestContext, Result,
    SkippedSource,
};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Second-degree set of a source, plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondDegreeSet {
    pub members: BTreeSet<MemberId>,
    pub from_cache: bool,
    /// Cover used for the rebuild; `None` on a cache hit.
    pub selection: Option<CoverSelection>,
    /// Nodes or partitions whose contribution is missing from `members`.
    pub skipped: Vec<SkippedSource>,
}

impl SecondDegreeSet {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
            && self
                .selection
                .as_ref()
                .is_none_or(CoverSelection::is_complete)
    }
}

/// Answer to a distance batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceReport {
    /// One entry per requested destination, in request order.
    pub distances: Vec<GraphDistance>,
    pub second_degree_from_cache: bool,
    /// Fan-out sources left out of the second-degree set.
    pub skipped_sources: usize,
    /// Destinations classified as 4 because their own lookup failed.
    pub degraded: Vec<MemberId>,
}

/// Computes first/second/third-degree relationships over the sharded graph.
pub struct DegreeResolver {
    topology: Arc<ClusterTopology>,
    cache: SecondDegreeCache,
    stats: ResolverStats,
}

impl DegreeResolver {
    pub fn new(topology: Arc<ClusterTopology>, cache: SecondDegreeCache) -> Self {
        Self {
            topology,
            cache,
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> ResolverStatsSnapshot {
        self.stats.snapshot()
    }

    /// First-degree connections of `member`, read from its owning partition.
    pub async fn direct_connections(
        &self,
        ctx: &RequestContext,
        member: MemberId,
    ) -> Result<Vec<MemberId>> {
        self.topology
            .owner_of(member)?
            .connections_for(ctx, member)
            .await
    }

    /// Connections that `first` and `second` have in common, in `first`'s order.
    pub async fn shared_connections(
        &self,
        ctx: &RequestContext,
        first: MemberId,
        second: MemberId,
    ) -> Result<Vec<MemberId>> {
        let (first_list, second_list) = tokio::try_join!(
            self.direct_connections(ctx, first),
            self.direct_connections(ctx, second)
        )?;
        let lookup: HashSet<MemberId> = second_list.into_iter().collect();
        Ok(first_list
            .into_iter()
            .filter(|member| lookup.contains(member))
            .collect())
    }

    /// Writes a directed edge to the partition owning its source.
    ///
    /// Cached second-degree sets are left alone; they catch up within one TTL.
    pub async fn store_connection(
        &self,
        ctx: &RequestContext,
        connection: &Connection,
    ) -> Result<()> {
        self.topology
            .owner_of(connection.source_id)?
            .store_connection(ctx, connection)
            .await
    }

    /// Cached second-degree set of `source`, rebuilt from `first_degree` on a miss.
    pub async fn second_degree(
        &self,
        ctx: &RequestContext,
        source: MemberId,
        first_degree: &[MemberId],
    ) -> SecondDegreeSet {
        if let Some(members) = self.cache.get(ctx, source).await {
            self.stats.record_cache_hit();
            event!(Level::DEBUG, source = %source, size = members.len(), "second-degree cache hit");
            return SecondDegreeSet {
                members,
                from_cache: true,
                selection: None,
                skipped: Vec::new(),
            };
        }

        self.stats.record_cache_miss();
        event!(Level::DEBUG, source = %source, "second-degree cache miss");
        self.build_second_degree(ctx, source, first_degree).await
    }

    /// Fans out to the minimal covering nodes and unions their answers.
    ///
    /// Node and partition failures are absorbed into `skipped`. A complete
    /// result is written through to the cache; a degraded one is returned but
    /// not cached, so the next request retries the full fan-out.
    pub async fn build_second_degree(
        &self,
        ctx: &RequestContext,
        source: MemberId,
        first_degree: &[MemberId],
    ) -> SecondDegreeSet {
        let required = self.topology.partitions_of(first_degree);
        let selection = find_minimum_node_set(&required, self.topology.routing_table());
        self.stats.record_cover_computation();
        event!(
            Level::DEBUG,
            source = %source,
            required_partitions = required.len(),
            nodes = ?selection.node_ids(),
            "covering set selected"
        );
        if !selection.is_complete() {
            event!(
                Level::WARN,
                source = %source,
                unreachable = ?selection.unreachable,
                "partitions without a covering node were dropped"
            );
        }

        let lookups = selection.selected.iter().map(|entry| async move {
            let result = match self.topology.node(&entry.id) {
                Some(node) => node.second_degree_connections(ctx, first_degree).await,
                None => Err(GraphError::ConfigInvariantViolation(format!(
                    "covering node '{}' is not part of the topology",
                    entry.id
                ))),
            };
            (entry.id.as_str(), result)
        });

        let mut aggregate = BestEffort::complete(BTreeSet::new());
        for (node_id, result) in join_all(lookups).await {
            match result {
                Ok(partial) => {
                    let (members, skipped) = partial.into_parts();
                    aggregate.value.extend(members);
                    aggregate.skipped.extend(skipped);
                }
                Err(err) => {
                    event!(
                        Level::WARN,
                        node = %node_id,
                        error = %err,
                        "second-degree node query failed, skipping"
                    );
                    aggregate.skip(node_id, err);
                }
            }
        }
        self.stats.record_skipped_sources(aggregate.skipped.len());

        if aggregate.is_complete() {
            if let Err(err) = self.cache.put(ctx, source, &aggregate.value).await {
                event!(
                    Level::WARN,
                    source = %source,
                    error = %err,
                    "failed to cache second-degree connections"
                );
            }
        } else {
            event!(
                Level::WARN,
                source = %source,
                skipped = aggregate.skipped.len(),
                "second-degree set is degraded, not caching"
            );
        }

        let (members, skipped) = aggregate.into_parts();
        SecondDegreeSet {
            members,
            from_cache: false,
            selection: Some(selection),
            skipped,
        }
    }

    /// Classifies the distance from `source` to each of `destinations`.
    ///
    /// Failing to read the source's own connections fails the whole batch.
    /// Anything going wrong for a single destination only degrades that
    /// destination to [`Distance::Beyond`].
    pub async fn distances(
        &self,
        ctx: &RequestContext,
        source: MemberId,
        destinations: &[MemberId],
    ) -> Result<DistanceReport> {
        let span = info_span!(
            "degree.distances",
            request_id = %ctx.id(),
            source = %source,
            destinations = destinations.len()
        );
        self.distances_in_span(ctx, source, destinations)
            .instrument(span)
            .await
    }

    async fn distances_in_span(
        &self,
        ctx: &RequestContext,
        source: MemberId,
        destinations: &[MemberId],
    ) -> Result<DistanceReport> {
        let first_degree = match self.direct_connections(ctx, source).await {
            Ok(first_degree) => first_degree,
            Err(err) => {
                self.stats.record_failed_request();
                event!(
                    Level::ERROR,
                    error = %err,
                    remaining_ms = ctx.remaining().as_millis() as u64,
                    "first-degree lookup for source failed"
                );
                return Err(err);
            }
        };

        let second_degree = self.second_degree(ctx, source, &first_degree).await;
        let first_set: HashSet<MemberId> = first_degree.iter().copied().collect();

        let classifications = destinations.iter().map(|&dest| {
            let first_set = &first_set;
            let second = &second_degree.members;
            async move { (dest, self.classify(ctx, dest, first_set, second).await) }
        });

        let mut distances = Vec::with_capacity(destinations.len());
        let mut degraded = Vec::new();
        for (dest, outcome) in join_all(classifications).await {
            let distance = match outcome {
                Ok(distance) => distance,
                Err(err) => {
                    self.stats.record_degraded_destination();
                    event!(
                        Level::WARN,
                        dest = %dest,
                        error = %err,
                        "third-degree lookup failed, reporting distance 4"
                    );
                    degraded.push(dest);
                    Distance::Beyond
                }
            };
            distances.push(GraphDistance {
                source_id: source,
                dest_id: dest,
                distance,
            });
        }

        event!(
            Level::DEBUG,
            from_cache = second_degree.from_cache,
            second_degree = second_degree.members.len(),
            degraded = degraded.len(),
            "distance batch classified"
        );

        Ok(DistanceReport {
            distances,
            second_degree_from_cache: second_degree.from_cache,
            skipped_sources: second_degree.skipped.len(),
            degraded,
        })
    }

    async fn classify(
        &self,
        ctx: &RequestContext,
        dest: MemberId,
        first_degree: &HashSet<MemberId>,
        second_degree: &BTreeSet<MemberId>,
    ) -> Result<Distance> {
        if first_degree.contains(&dest) {
            return Ok(Distance::First);
        }
        if second_degree.contains(&dest) {
            return Ok(Distance::Second);
        }
        if second_degree.is_empty() {
            return Ok(Distance::Beyond);
        }

        let dest_connections = self.direct_connections(ctx, dest).await?;
        if dest_connections
            .iter()
            .any(|member| second_degree.contains(member))
        {
            Ok(Distance::Third)
        } else {
            Ok(Distance::Beyond)
        }
    }
}
