//! Minimum covering set selection.
//!
//! Picks a small set of nodes whose owned partitions cover every partition a
//! query needs, bounding the fan-out of the second-degree step. Exact minimum
//! set cover is NP-hard; this is the classic greedy approximation (within a
//! factor of ln(n) of optimal).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Routing-table view of a node: its id and the partitions it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub partitions: BTreeSet<u32>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, partitions: impl IntoIterator<Item = u32>) -> Self {
        Self {
            id: id.into(),
            partitions: partitions.into_iter().collect(),
        }
    }
}

/// Outcome of a cover computation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverSelection {
    /// Chosen nodes, in selection order.
    pub selected: Vec<GraphNode>,
    /// Required partitions no node owns. A soft miss, not an error.
    pub unreachable: BTreeSet<u32>,
}

impl CoverSelection {
    pub fn node_ids(&self) -> Vec<&str> {
        self.selected.iter().map(|node| node.id.as_str()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unreachable.is_empty()
    }
}

/// Greedy set cover over `nodes` for the `required` partitions.
///
/// Each round picks the node covering the most still-uncovered partitions;
/// ties go to the node that comes first in `nodes`. Stops when everything is
/// covered or no node covers anything new.
pub fn find_minimum_node_set(required: &BTreeSet<u32>, nodes: &[GraphNode]) -> CoverSelection {
    let mut uncovered = required.clone();
    let mut selected = Vec::new();

    while !uncovered.is_empty() {
        let Some(best) = best_covering_node(&uncovered, nodes) else {
            break;
        };
        let node = &nodes[best];
        uncovered.retain(|partition| !node.partitions.contains(partition));
        selected.push(node.clone());
    }

    CoverSelection {
        selected,
        unreachable: uncovered,
    }
}

fn best_covering_node(uncovered: &BTreeSet<u32>, nodes: &[GraphNode]) -> Option<usize> {
    let mut best = None;
    let mut max_covered = 0;

    for (index, node) in nodes.iter().enumerate() {
        let covered = node
            .partitions
            .iter()
            .filter(|partition| uncovered.contains(partition))
            .count();
        if covered > max_covered {
            max_covered = covered;
            best = Some(index);
        }
    }

    best
}
