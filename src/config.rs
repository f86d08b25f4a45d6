use crate::core::{DEFAULT_REQUEST_TIMEOUT, GraphError, Result};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::time::Duration;

/// Default number of partitions owned by each node.
pub const DEFAULT_PARTITIONS_PER_NODE: u32 = 10;

/// Default lifetime of a cached second-degree set.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default storage endpoint when none is configured.
pub const DEFAULT_ENDPOINT: &str = "localhost:6379";

/// Cluster configuration
///
/// One node per storage endpoint. Node `i` is named `node-i` and owns the
/// contiguous partition range `[i * partitions_per_node, (i + 1) * partitions_per_node)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Storage endpoints, one per node
    pub endpoints: Vec<String>,

    /// Partitions owned by each node
    pub partitions_per_node: u32,

    /// Endpoint backing the second-degree cache (first endpoint when unset)
    pub cache_endpoint: Option<String>,

    /// Time-to-live of cached second-degree sets
    pub cache_ttl: Duration,

    /// Deadline for one distance batch
    pub request_timeout: Duration,

    /// Optional bound on cached second-degree sets, least recently used evicted first.
    /// Applies to the cache only; adjacency stores are never bounded.
    pub cache_capacity: Option<NonZeroUsize>,
}

/// Partition range and endpoint assigned to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAssignment {
    pub node_id: String,
    pub endpoint: String,
    pub partitions: Range<u32>,
}

impl ClusterConfig {
    /// Create a configuration for the given endpoints
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            partitions_per_node: DEFAULT_PARTITIONS_PER_NODE,
            cache_endpoint: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_capacity: None,
        }
    }

    /// Parse a comma-separated endpoint list, e.g. `"a:6379,b:6379"`
    pub fn parse_endpoints(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Set partitions per node
    pub fn partitions_per_node(mut self, partitions_per_node: u32) -> Self {
        self.partitions_per_node = partitions_per_node;
        self
    }

    /// Set the cache endpoint
    pub fn cache_endpoint(mut self, endpoint: &str) -> Self {
        self.cache_endpoint = Some(endpoint.to_string());
        self
    }

    /// Set cache TTL
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the per-request deadline
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Bound the number of cached second-degree sets
    pub fn cache_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn node_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn total_partitions(&self) -> u32 {
        (self.endpoints.len() as u32).saturating_mul(self.partitions_per_node)
    }

    /// Endpoint used for the second-degree cache.
    pub fn effective_cache_endpoint(&self) -> Option<&str> {
        self.cache_endpoint
            .as_deref()
            .or_else(|| self.endpoints.first().map(String::as_str))
    }

    /// Partition assignment, node by node.
    pub fn assignments(&self) -> Vec<NodeAssignment> {
        self.endpoints
            .iter()
            .enumerate()
            .map(|(index, endpoint)| {
                let start = index as u32 * self.partitions_per_node;
                NodeAssignment {
                    node_id: format!("node-{}", index),
                    endpoint: endpoint.clone(),
                    partitions: start..start + self.partitions_per_node,
                }
            })
            .collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(GraphError::ConfigInvariantViolation(
                "at least one storage endpoint is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.trim().is_empty() {
                return Err(GraphError::ConfigInvariantViolation(
                    "storage endpoints must not be blank".to_string(),
                ));
            }
            if !seen.insert(endpoint.trim()) {
                return Err(GraphError::ConfigInvariantViolation(format!(
                    "storage endpoint '{}' is listed more than once",
                    endpoint
                )));
            }
        }

        if self.partitions_per_node == 0 {
            return Err(GraphError::ConfigInvariantViolation(
                "partitions_per_node must be > 0".to_string(),
            ));
        }

        if (self.endpoints.len() as u64) * u64::from(self.partitions_per_node) > u64::from(u32::MAX)
        {
            return Err(GraphError::ConfigInvariantViolation(
                "total partition count does not fit in 32 bits".to_string(),
            ));
        }

        if let Some(cache_endpoint) = &self.cache_endpoint
            && cache_endpoint.trim().is_empty()
        {
            return Err(GraphError::ConfigInvariantViolation(
                "cache endpoint must not be blank".to_string(),
            ));
        }

        if self.cache_ttl.is_zero() {
            return Err(GraphError::ConfigInvariantViolation(
                "cache_ttl must be > 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(GraphError::ConfigInvariantViolation(
                "request_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::new([DEFAULT_ENDPOINT])
    }
}
