use crate::core::{Connection, GraphError, MemberId, RequestContext, Result};
use crate::storage::OrderedSetStore;
use std::fmt;
use std::sync::Arc;

const CONNECTIONS_KEY_PREFIX: &str = "connections:";

/// Store key holding the adjacency list of `member`.
pub fn connections_key(member: MemberId) -> String {
    format!("{}{}", CONNECTIONS_KEY_PREFIX, member)
}

/// One shard of the adjacency list.
///
/// Exclusively owns its store handle; performs no caching of its own.
pub struct Partition {
    id: u32,
    store: Arc<dyn OrderedSetStore>,
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition").field("id", &self.id).finish()
    }
}

impl Partition {
    pub fn new(id: u32, store: Arc<dyn OrderedSetStore>) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Reads the adjacency list of `member`, ordered by destination id.
    pub async fn get_connections(
        &self,
        ctx: &RequestContext,
        member: MemberId,
    ) -> Result<Vec<MemberId>> {
        let key = connections_key(member);
        let raw = ctx
            .call(
                &format!("partition {} read of {}", self.id, key),
                self.store.range_all(&key),
            )
            .await
            .map_err(|err| self.store_error(err))?;

        raw.iter()
            .map(|entry| {
                entry.parse::<MemberId>().map_err(|_| {
                    GraphError::StoreUnavailable(format!(
                        "partition {} returned malformed member '{}' under {}",
                        self.id, entry, key
                    ))
                })
            })
            .collect()
    }

    /// Inserts a directed edge keyed by source, scored by destination id.
    pub async fn store_connection(
        &self,
        ctx: &RequestContext,
        connection: &Connection,
    ) -> Result<()> {
        let key = connections_key(connection.source_id);
        let member = connection.dest_id.canonical();
        ctx.call(
            &format!("partition {} write of {}", self.id, key),
            self.store
                .add_ordered_member(&key, &member, connection.dest_id.get() as f64),
        )
        .await
        .map_err(|err| self.store_error(err))
    }

    fn store_error(&self, err: GraphError) -> GraphError {
        match err {
            GraphError::StoreUnavailable(_) | GraphError::StoreTimeout(_) => err,
            other => GraphError::StoreUnavailable(format!("partition {}: {}", self.id, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryOrderedSetStore;

    fn partition() -> (Partition, Arc<InMemoryOrderedSetStore>) {
        let store = Arc::new(InMemoryOrderedSetStore::new("mem"));
        (Partition::new(3, store.clone()), store)
    }

    #[tokio::test]
    async fn stored_connection_is_immediately_readable() {
        let (partition, _) = partition();
        let ctx = RequestContext::default();
        partition
            .store_connection(&ctx, &Connection::new(100, 300))
            .await
            .unwrap();
        partition
            .store_connection(&ctx, &Connection::new(100, 200))
            .await
            .unwrap();

        let connections = partition.get_connections(&ctx, MemberId(100)).await.unwrap();
        assert_eq!(connections, vec![MemberId(200), MemberId(300)]);
        assert!(
            partition
                .get_connections(&ctx, MemberId(200))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn malformed_entries_surface_as_store_errors() {
        let (partition, store) = partition();
        store
            .add_ordered_member(&connections_key(MemberId(1)), "not-a-number", 0.0)
            .await
            .unwrap();

        let err = partition
            .get_connections(&RequestContext::default(), MemberId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::StoreUnavailable(_)));
    }
}
