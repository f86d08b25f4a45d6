// ============================================================================
// graphreach: connection-distance engine over a sharded adjacency store
// ============================================================================

pub mod cluster;
pub mod config;
pub mod core;
pub mod degree;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use cluster::{ClusterTopology, GraphNode, Node, Partition, find_minimum_node_set, partition_of};
pub use config::ClusterConfig;
pub use core::{Connection, Distance, GraphDistance, GraphError, MemberId, RequestContext, Result};
pub use degree::{DegreeResolver, DistanceReport, SecondDegreeCache};
pub use storage::{InMemoryConnector, InMemoryOrderedSetStore, OrderedSetStore, StoreConnector};
