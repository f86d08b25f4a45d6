pub mod aggregate;
pub mod context;
pub mod error;
pub mod types;

pub use aggregate::{BestEffort, SkippedSource};
pub use context::{DEFAULT_REQUEST_TIMEOUT, RequestContext};
pub use error::{GraphError, Result};
pub use types::{Connection, Distance, GraphDistance, MemberId};
