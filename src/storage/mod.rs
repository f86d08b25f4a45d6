pub mod connector;
pub mod memory;
pub mod persistence;
pub mod store;

pub use connector::{InMemoryConnector, StoreConnector};
pub use memory::InMemoryOrderedSetStore;
pub use persistence::{ClusterSnapshot, SetSnapshot, SnapshotManager, StoreSnapshot};
pub use store::{OrderedSetStore, ScoredMember};
