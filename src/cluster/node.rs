use super::cover::GraphNode;
use super::partition::Partition;
use super::routing::partition_of;
use crate::core::{BestEffort, Connection, GraphError, MemberId, RequestContext, Result};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use tracing::{Level, event};

type PartitionMap = BTreeMap<u32, Arc<Partition>>;

/// A cluster participant owning a fixed set of partitions.
///
/// The partition map is assigned at construction and never written afterwards.
/// Readers take a cheap snapshot (`Arc`) of the map under the read lock and
/// release it before any store call, so concurrent requests never contend.
/// The lock keeps the door open for a future rebalancer without changing
/// reader code.
pub struct Node {
    id: String,
    total_partitions: u32,
    partitions: RwLock<Arc<PartitionMap>>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let partitions = self
            .partitions
            .read()
            .map(|map| map.keys().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("total_partitions", &self.total_partitions)
            .field("partitions", &partitions)
            .finish()
    }
}

impl Node {
    /// Creates a node owning `partitions` out of a cluster of `total_partitions`.
    ///
    /// Rejects an empty id, partition ids outside the cluster range and
    /// duplicate partition ids.
    pub fn new(
        id: impl Into<String>,
        total_partitions: u32,
        partitions: Vec<Partition>,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(GraphError::ConfigInvariantViolation(
                "node id must not be empty".to_string(),
            ));
        }
        if total_partitions == 0 {
            return Err(GraphError::ConfigInvariantViolation(
                "total_partitions must be >= 1".to_string(),
            ));
        }

        let mut map = PartitionMap::new();
        for partition in partitions {
            let partition_id = partition.id();
            if partition_id >= total_partitions {
                return Err(GraphError::ConfigInvariantViolation(format!(
                    "Partition {} on node '{}' is out of range for {} partitions",
                    partition_id, id, total_partitions
                )));
            }
            if map.insert(partition_id, Arc::new(partition)).is_some() {
                return Err(GraphError::ConfigInvariantViolation(format!(
                    "Partition {} appears more than once on node '{}'",
                    partition_id, id
                )));
            }
        }

        Ok(Self {
            id,
            total_partitions,
            partitions: RwLock::new(Arc::new(map)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn total_partitions(&self) -> u32 {
        self.total_partitions
    }

    /// Immutable view of the partition map.
    pub fn partitions(&self) -> Result<Arc<BTreeMap<u32, Arc<Partition>>>> {
        Ok(self.partitions.read()?.clone())
    }

    pub fn partition_ids(&self) -> Result<BTreeSet<u32>> {
        Ok(self.partitions()?.keys().copied().collect())
    }

    pub fn owns(&self, partition_id: u32) -> Result<bool> {
        Ok(self.partitions()?.contains_key(&partition_id))
    }

    /// Routing-table entry used by the covering-set selector.
    pub fn routing_entry(&self) -> Result<GraphNode> {
        Ok(GraphNode::new(self.id.clone(), self.partition_ids()?))
    }

    /// Resolves the locally owned partition holding `member`.
    pub fn partition_for(&self, member: MemberId) -> Result<Arc<Partition>> {
        let partition_id = partition_of(member, self.total_partitions);
        self.partitions()?
            .get(&partition_id)
            .cloned()
            .ok_or_else(|| GraphError::PartitionNotOwned {
                node_id: self.id.clone(),
                partition_id,
            })
    }

    /// First-degree connections of a member whose partition this node owns.
    pub async fn connections_for(
        &self,
        ctx: &RequestContext,
        member: MemberId,
    ) -> Result<Vec<MemberId>> {
        self.partition_for(member)?
            .get_connections(ctx, member)
            .await
    }

    pub async fn store_connection(
        &self,
        ctx: &RequestContext,
        connection: &Connection,
    ) -> Result<()> {
        self.partition_for(connection.source_id)?
            .store_connection(ctx, connection)
            .await
    }

    /// Union of the adjacency lists of every id in `first_degree` that this
    /// node owns.
    ///
    /// Ids owned elsewhere are skipped silently; another node in the covering
    /// set answers for them. A failing partition read drops only that read's
    /// contribution and is reported in `skipped`.
    pub async fn second_degree_connections(
        &self,
        ctx: &RequestContext,
        first_degree: &[MemberId],
    ) -> Result<BestEffort<BTreeSet<MemberId>>> {
        let partitions = self.partitions()?;
        let mut seen = BTreeSet::new();
        let lookups = first_degree
            .iter()
            .copied()
            .filter(|member| seen.insert(*member))
            .filter_map(|member| {
                let partition_id = partition_of(member, self.total_partitions);
                partitions
                    .get(&partition_id)
                    .map(|partition| (member, partition.clone()))
            })
            .map(|(member, partition)| async move {
                let result = partition.get_connections(ctx, member).await;
                (member, partition.id(), result)
            });

        let mut aggregate = BestEffort::complete(BTreeSet::new());
        for (member, partition_id, result) in join_all(lookups).await {
            match result {
                Ok(connections) => aggregate.value.extend(connections),
                Err(err) => {
                    event!(
                        Level::WARN,
                        node = %self.id,
                        partition = partition_id,
                        member = %member,
                        error = %err,
                        "second-degree partition read failed, skipping"
                    );
                    aggregate.skip(format!("{}/partition-{}", self.id, partition_id), err);
                }
            }
        }
        Ok(aggregate)
    }
}
