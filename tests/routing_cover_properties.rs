//! Property tests for partition routing, topology ownership and the greedy
//! covering-set selector.

use graphreach::cluster::validate_partition_ownership;
use graphreach::{
    ClusterConfig, ClusterTopology, GraphNode, InMemoryConnector, MemberId, find_minimum_node_set,
    partition_of,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn node_collection() -> impl Strategy<Value = Vec<GraphNode>> {
    prop::collection::vec(prop::collection::btree_set(0u32..32, 0..10), 1..8).prop_map(|sets| {
        sets.into_iter()
            .enumerate()
            .map(|(index, partitions)| GraphNode::new(format!("node-{index}"), partitions))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_partition_is_deterministic_and_in_range(raw in any::<i64>(), total in 1u32..10_000) {
        let member = MemberId(raw);
        let first = partition_of(member, total);
        prop_assert!(first < total);
        prop_assert_eq!(first, partition_of(member, total));
    }

    #[test]
    fn prop_configured_topology_partitions_every_id_exactly_once(
        node_count in 1usize..8,
        per_node in 1u32..16,
    ) {
        let endpoints: Vec<String> = (0..node_count).map(|i| format!("store-{i}:6379")).collect();
        let config = ClusterConfig::new(endpoints).partitions_per_node(per_node);
        let topology = ClusterTopology::from_config(&config, &InMemoryConnector::new()).unwrap();
        let total = topology.total_partitions();
        prop_assert_eq!(total, node_count as u32 * per_node);

        let routing = topology.routing_table();
        prop_assert!(validate_partition_ownership(routing, total).is_ok());

        let mut seen = BTreeSet::new();
        for entry in routing {
            for partition in &entry.partitions {
                prop_assert!(seen.insert(*partition), "partition {} owned twice", partition);
            }
        }
        prop_assert_eq!(seen, (0..total).collect::<BTreeSet<_>>());

        for partition in 0..total {
            let owner = topology.owner_of_partition(partition).unwrap();
            prop_assert!(owner.owns(partition).unwrap());
        }
    }

    #[test]
    fn prop_every_member_routes_to_an_owning_node(raw in any::<i64>(), node_count in 1usize..6) {
        let endpoints: Vec<String> = (0..node_count).map(|i| format!("store-{i}:6379")).collect();
        let config = ClusterConfig::new(endpoints).partitions_per_node(3);
        let topology = ClusterTopology::from_config(&config, &InMemoryConnector::new()).unwrap();

        let member = MemberId(raw);
        let owner = topology.owner_of(member).unwrap();
        prop_assert!(owner.owns(topology.partition_of(member)).unwrap());
    }

    #[test]
    fn prop_cover_spans_every_coverable_partition(
        nodes in node_collection(),
        required in prop::collection::btree_set(0u32..32, 0..20),
    ) {
        let owned: BTreeSet<u32> = nodes.iter().flat_map(|n| n.partitions.iter().copied()).collect();
        let selection = find_minimum_node_set(&required, &nodes);

        let covered: BTreeSet<u32> = selection
            .selected
            .iter()
            .flat_map(|n| n.partitions.iter().copied())
            .collect();
        let coverable: BTreeSet<u32> = required.intersection(&owned).copied().collect();
        prop_assert!(coverable.is_subset(&covered));

        let expected_unreachable: BTreeSet<u32> = required.difference(&owned).copied().collect();
        prop_assert_eq!(&selection.unreachable, &expected_unreachable);
        prop_assert_eq!(selection.is_complete(), required.is_subset(&owned));
    }

    #[test]
    fn prop_each_selected_node_adds_new_coverage(
        nodes in node_collection(),
        required in prop::collection::btree_set(0u32..32, 0..20),
    ) {
        let selection = find_minimum_node_set(&required, &nodes);

        let mut uncovered = required.clone();
        for node in &selection.selected {
            let before = uncovered.len();
            uncovered.retain(|p| !node.partitions.contains(p));
            prop_assert!(uncovered.len() < before, "{} contributed nothing", node.id);
        }
        prop_assert!(selection.selected.len() <= nodes.len());
    }

    #[test]
    fn prop_cover_is_deterministic(
        nodes in node_collection(),
        required in prop::collection::btree_set(0u32..32, 0..20),
    ) {
        prop_assert_eq!(
            find_minimum_node_set(&required, &nodes),
            find_minimum_node_set(&required, &nodes)
        );
    }
}
