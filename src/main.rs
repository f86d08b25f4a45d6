use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use graphreach::{
    ClusterConfig, ClusterTopology, Connection, DegreeResolver, InMemoryConnector, RequestContext,
    SecondDegreeCache,
    config::{DEFAULT_ENDPOINT, DEFAULT_PARTITIONS_PER_NODE},
    storage::SnapshotManager,
    web::{AppState, build_router},
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "graphreach")]
#[command(about = "Connection-distance service over a sharded social graph")]
struct Args {
    /// Comma-separated storage endpoints, one node per endpoint
    #[arg(long, env = "GRAPH_STORE_ENDPOINTS", default_value = DEFAULT_ENDPOINT)]
    endpoints: String,

    #[arg(long, env = "GRAPH_PARTITIONS_PER_NODE", default_value_t = DEFAULT_PARTITIONS_PER_NODE)]
    partitions_per_node: u32,

    /// Endpoint backing the second-degree cache (defaults to the first endpoint)
    #[arg(long, env = "GRAPH_CACHE_ENDPOINT")]
    cache_endpoint: Option<String>,

    #[arg(long, env = "GRAPH_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen: String,

    #[arg(long, env = "GRAPH_CACHE_TTL_SECS", default_value_t = 24 * 60 * 60)]
    cache_ttl_secs: u64,

    #[arg(long, env = "GRAPH_REQUEST_TIMEOUT_MS", default_value_t = 5_000)]
    request_timeout_ms: u64,

    /// Upper bound on cached second-degree sets, least recently used evicted first
    #[arg(long, env = "GRAPH_CACHE_CAPACITY")]
    cache_capacity: Option<NonZeroUsize>,

    /// MessagePack snapshot restored at startup and written on shutdown
    #[arg(long, env = "GRAPH_SNAPSHOT_PATH")]
    snapshot: Option<PathBuf>,

    /// JSON array of connections loaded at startup
    #[arg(long, env = "GRAPH_SEED_FILE")]
    seed: Option<PathBuf>,
}

impl Args {
    fn cluster_config(&self) -> ClusterConfig {
        let mut config = ClusterConfig::new(ClusterConfig::parse_endpoints(&self.endpoints))
            .partitions_per_node(self.partitions_per_node)
            .cache_ttl(Duration::from_secs(self.cache_ttl_secs))
            .request_timeout(Duration::from_millis(self.request_timeout_ms));
        if let Some(endpoint) = &self.cache_endpoint {
            config = config.cache_endpoint(endpoint);
        }
        if let Some(capacity) = self.cache_capacity {
            config = config.cache_capacity(capacity);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = args.cluster_config();
    config
        .validate()
        .context("invalid cluster configuration")?;

    let connector = Arc::new(InMemoryConnector::new());
    let snapshots = args.snapshot.as_ref().map(SnapshotManager::new);
    if let Some(manager) = &snapshots {
        if let Some(snapshot) = manager.load().context("failed to load snapshot")? {
            let restored = connector
                .restore(snapshot)
                .context("failed to restore snapshot")?;
            info!(path = %manager.path().display(), keys = restored, "snapshot restored");
        }
    }

    let topology =
        ClusterTopology::from_config(&config, connector.as_ref()).context("failed to build topology")?;
    let cache = SecondDegreeCache::from_config(&config, connector.as_ref())
        .context("failed to connect the second-degree cache")?;

    info!(
        nodes = topology.nodes().len(),
        partitions = topology.total_partitions(),
        cache_endpoint = ?config.effective_cache_endpoint(),
        cache_capacity = ?config.cache_capacity,
        "cluster topology ready"
    );

    let resolver = Arc::new(DegreeResolver::new(Arc::new(topology), cache));

    if let Some(seed) = &args.seed {
        let loaded = seed_connections(&resolver, seed, config.request_timeout).await?;
        info!(path = %seed.display(), connections = loaded, "seed connections loaded");
    }

    let app = build_router(
        AppState::new(resolver.clone()).with_request_timeout(config.request_timeout),
    );

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind to {}", args.listen))?;

    info!(address = %args.listen, "graphreach started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(manager) = &snapshots {
        let snapshot = connector.snapshot().context("failed to capture snapshot")?;
        let keys = snapshot.key_count();
        manager.save(&snapshot).context("failed to write snapshot")?;
        info!(path = %manager.path().display(), keys, "snapshot written");
    }

    Ok(())
}

async fn seed_connections(
    resolver: &DegreeResolver,
    path: &Path,
    timeout: Duration,
) -> Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let connections: Vec<Connection> =
        serde_json::from_str(&raw).context("seed file must be a JSON array of connections")?;

    let mut loaded = 0;
    for connection in &connections {
        let ctx = RequestContext::with_timeout(timeout);
        match resolver.store_connection(&ctx, connection).await {
            Ok(()) => loaded += 1,
            Err(err) => warn!(
                source = %connection.source_id,
                dest = %connection.dest_id,
                error = %err,
                "failed to seed connection"
            ),
        }
    }
    Ok(loaded)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("graphreach=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
