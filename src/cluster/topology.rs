use super::cover::GraphNode;
use super::node::Node;
use super::partition::Partition;
use super::routing::partition_of;
use crate::config::ClusterConfig;
use crate::core::{GraphError, MemberId, Result};
use crate::storage::StoreConnector;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{Level, event};

/// Checks that `nodes` own every partition in `[0, total_partitions)` exactly once.
///
/// Gaps, duplicates and out-of-range ids are all rejected; serving with any of
/// them would leave members unroutable or double-served.
pub fn validate_partition_ownership(nodes: &[GraphNode], total_partitions: u32) -> Result<()> {
    if nodes.is_empty() {
        return Err(GraphError::ConfigInvariantViolation(
            "cluster has no nodes".to_string(),
        ));
    }
    if total_partitions == 0 {
        return Err(GraphError::ConfigInvariantViolation(
            "total_partitions must be >= 1".to_string(),
        ));
    }

    let mut node_ids = HashSet::new();
    let mut owners: Vec<Option<&str>> = vec![None; total_partitions as usize];
    for node in nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(GraphError::ConfigInvariantViolation(format!(
                "node id '{}' is used more than once",
                node.id
            )));
        }
        for &partition in &node.partitions {
            let Some(slot) = owners.get_mut(partition as usize) else {
                return Err(GraphError::ConfigInvariantViolation(format!(
                    "Partition {} on node '{}' is out of range for {} partitions",
                    partition, node.id, total_partitions
                )));
            };
            if let Some(previous) = slot {
                return Err(GraphError::ConfigInvariantViolation(format!(
                    "Partition {} is owned by both '{}' and '{}'",
                    partition, previous, node.id
                )));
            }
            *slot = Some(node.id.as_str());
        }
    }

    let gaps: Vec<String> = owners
        .iter()
        .enumerate()
        .filter(|(_, owner)| owner.is_none())
        .map(|(partition, _)| partition.to_string())
        .collect();
    if !gaps.is_empty() {
        return Err(GraphError::ConfigInvariantViolation(format!(
            "Partitions without an owner: {}",
            gaps.join(", ")
        )));
    }

    Ok(())
}

/// The fixed set of nodes and the partition -> node assignment.
///
/// Built and validated once at startup; immutable afterwards.
#[derive(Debug)]
pub struct ClusterTopology {
    nodes: Vec<Arc<Node>>,
    total_partitions: u32,
    owners: Vec<usize>,
    routing_table: Vec<GraphNode>,
}

impl ClusterTopology {
    /// Assembles a topology from already constructed nodes.
    ///
    /// Fails unless every partition is owned exactly once and all nodes agree
    /// on the partition count.
    pub fn new(nodes: Vec<Node>) -> Result<Self> {
        let Some(first) = nodes.first() else {
            return Err(GraphError::ConfigInvariantViolation(
                "cluster has no nodes".to_string(),
            ));
        };
        let total_partitions = first.total_partitions();
        if let Some(mismatch) = nodes
            .iter()
            .find(|node| node.total_partitions() != total_partitions)
        {
            return Err(GraphError::ConfigInvariantViolation(format!(
                "node '{}' expects {} partitions, node '{}' expects {}",
                mismatch.id(),
                mismatch.total_partitions(),
                first.id(),
                total_partitions
            )));
        }

        let routing_table = nodes
            .iter()
            .map(Node::routing_entry)
            .collect::<Result<Vec<_>>>()?;
        validate_partition_ownership(&routing_table, total_partitions)?;

        let mut owners = vec![0; total_partitions as usize];
        for (index, entry) in routing_table.iter().enumerate() {
            for &partition in &entry.partitions {
                owners[partition as usize] = index;
            }
        }

        Ok(Self {
            nodes: nodes.into_iter().map(Arc::new).collect(),
            total_partitions,
            owners,
            routing_table,
        })
    }

    /// Builds the topology described by `config`, acquiring one store handle
    /// per endpoint from `connector`.
    pub fn from_config(config: &ClusterConfig, connector: &dyn StoreConnector) -> Result<Self> {
        config.validate()?;
        let total_partitions = config.total_partitions();

        let mut nodes = Vec::with_capacity(config.node_count());
        for assignment in config.assignments() {
            let store = connector.connect(&assignment.endpoint)?;
            event!(
                Level::INFO,
                node = %assignment.node_id,
                endpoint = %assignment.endpoint,
                first_partition = assignment.partitions.start,
                last_partition = assignment.partitions.end - 1,
                "initializing node"
            );
            let partitions = assignment
                .partitions
                .clone()
                .map(|id| Partition::new(id, store.clone()))
                .collect();
            nodes.push(Node::new(assignment.node_id, total_partitions, partitions)?);
        }

        Self::new(nodes)
    }

    pub fn total_partitions(&self) -> u32 {
        self.total_partitions
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn node(&self, node_id: &str) -> Option<&Arc<Node>> {
        self.nodes.iter().find(|node| node.id() == node_id)
    }

    /// Routing-table view handed to the covering-set selector.
    pub fn routing_table(&self) -> &[GraphNode] {
        &self.routing_table
    }

    pub fn partition_of(&self, member: MemberId) -> u32 {
        partition_of(member, self.total_partitions)
    }

    /// Distinct partitions holding the adjacency lists of `members`.
    pub fn partitions_of(&self, members: &[MemberId]) -> BTreeSet<u32> {
        members
            .iter()
            .map(|member| self.partition_of(*member))
            .collect()
    }

    pub fn owner_of_partition(&self, partition_id: u32) -> Result<&Arc<Node>> {
        self.owners
            .get(partition_id as usize)
            .and_then(|index| self.nodes.get(*index))
            .ok_or_else(|| {
                GraphError::ConfigInvariantViolation(format!(
                    "Partition {} has no owner",
                    partition_id
                ))
            })
    }

    /// Node owning the adjacency list of `member`.
    pub fn owner_of(&self, member: MemberId) -> Result<&Arc<Node>> {
        self.owner_of_partition(self.partition_of(member))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryConnector;

    #[test]
    fn ownership_accepts_exact_partitioning() {
        let nodes = vec![GraphNode::new("a", [0, 2]), GraphNode::new("b", [1, 3])];
        assert!(validate_partition_ownership(&nodes, 4).is_ok());
    }

    #[test]
    fn ownership_rejects_gaps_duplicates_and_strays() {
        let gap = vec![GraphNode::new("a", [0]), GraphNode::new("b", [2])];
        let err = validate_partition_ownership(&gap, 3).unwrap_err();
        assert!(err.to_string().contains("without an owner: 1"));

        let overlap = vec![GraphNode::new("a", [0, 1]), GraphNode::new("b", [1])];
        let err = validate_partition_ownership(&overlap, 2).unwrap_err();
        assert!(err.to_string().contains("owned by both 'a' and 'b'"));

        let stray = vec![GraphNode::new("a", [0, 5])];
        assert!(validate_partition_ownership(&stray, 1).is_err());

        let same_id = vec![GraphNode::new("a", [0]), GraphNode::new("a", [1])];
        assert!(validate_partition_ownership(&same_id, 2).is_err());

        assert!(validate_partition_ownership(&[], 2).is_err());
    }

    #[test]
    fn from_config_assigns_contiguous_ranges() {
        let config = ClusterConfig::new(["a", "b", "c"]).partitions_per_node(2);
        let topology = ClusterTopology::from_config(&config, &InMemoryConnector::new()).unwrap();

        assert_eq!(topology.total_partitions(), 6);
        assert_eq!(topology.nodes().len(), 3);
        assert_eq!(topology.owner_of_partition(0).unwrap().id(), "node-0");
        assert_eq!(topology.owner_of_partition(3).unwrap().id(), "node-1");
        assert_eq!(topology.owner_of_partition(5).unwrap().id(), "node-2");
        assert!(topology.owner_of_partition(6).is_err());

        let member = MemberId(12345);
        let owner = topology.owner_of(member).unwrap();
        assert!(owner.owns(topology.partition_of(member)).unwrap());
    }

    #[test]
    fn empty_topology_refuses_to_start() {
        assert!(matches!(
            ClusterTopology::new(Vec::new()),
            Err(GraphError::ConfigInvariantViolation(_))
        ));
        let config = ClusterConfig::new(Vec::<String>::new());
        assert!(ClusterTopology::from_config(&config, &InMemoryConnector::new()).is_err());
    }
}
