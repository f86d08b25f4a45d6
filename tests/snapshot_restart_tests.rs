//! Graph data survives a snapshot written on shutdown and restored on startup

use graphreach::storage::SnapshotManager;
use graphreach::{
    ClusterConfig, ClusterTopology, Connection, DegreeResolver, InMemoryConnector, MemberId,
    RequestContext, SecondDegreeCache, StoreConnector,
};
use std::sync::Arc;
use tempfile::TempDir;

fn resolver(config: &ClusterConfig, connector: &InMemoryConnector) -> DegreeResolver {
    let topology = ClusterTopology::from_config(config, connector).unwrap();
    let cache_store = connector
        .connect(config.effective_cache_endpoint().unwrap())
        .unwrap();
    DegreeResolver::new(
        Arc::new(topology),
        SecondDegreeCache::new(cache_store, config.cache_ttl),
    )
}

#[tokio::test]
async fn test_snapshot_restores_adjacency_and_cache() {
    let temp_dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(temp_dir.path().join("graph.snapshot"));
    let config = ClusterConfig::new(["store-a:6379", "store-b:6379"]).partitions_per_node(3);
    let ctx = RequestContext::default();

    // First process lifetime
    let connector = InMemoryConnector::new();
    let before = resolver(&config, &connector);
    for (source, dest) in [(100, 200), (100, 300), (200, 400), (300, 500)] {
        before
            .store_connection(&ctx, &Connection::new(source, dest))
            .await
            .unwrap();
    }
    before
        .distances(&ctx, MemberId(100), &[MemberId(400)])
        .await
        .unwrap();
    manager.save(&connector.snapshot().unwrap()).unwrap();
    assert!(manager.exists());

    // Second process lifetime
    let restored_connector = InMemoryConnector::new();
    let snapshot = manager.load().unwrap().expect("snapshot should exist");
    assert!(restored_connector.restore(snapshot).unwrap() > 0);
    let after = resolver(&config, &restored_connector);

    assert_eq!(
        after.direct_connections(&ctx, MemberId(100)).await.unwrap(),
        vec![MemberId(200), MemberId(300)]
    );

    let report = after
        .distances(&ctx, MemberId(100), &[MemberId(500)])
        .await
        .unwrap();
    assert!(report.second_degree_from_cache);
    assert_eq!(report.distances[0].distance.hops(), 2);
}

#[test]
fn test_missing_snapshot_loads_as_none() {
    let temp_dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(temp_dir.path().join("absent.snapshot"));
    assert!(!manager.exists());
    assert!(manager.load().unwrap().is_none());
}
