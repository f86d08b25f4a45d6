use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Configuration invariant violated: {0}")]
    ConfigInvariantViolation(String),

    #[error("Partition {partition_id} is not owned by node '{node_id}'")]
    PartitionNotOwned { node_id: String, partition_id: u32 },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store call timed out: {0}")]
    StoreTimeout(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl GraphError {
    /// Store failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::StoreTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

impl<T> From<std::sync::PoisonError<T>> for GraphError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
