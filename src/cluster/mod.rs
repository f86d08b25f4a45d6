//! Sharded adjacency storage: routing, partitions, nodes and the topology
//! that ties them together, plus the covering-set selector used for fan-out.

pub mod cover;
pub mod node;
pub mod partition;
pub mod routing;
pub mod topology;

pub use cover::{CoverSelection, GraphNode, find_minimum_node_set};
pub use node::Node;
pub use partition::{Partition, connections_key};
pub use routing::partition_of;
pub use topology::{ClusterTopology, validate_partition_ownership};
