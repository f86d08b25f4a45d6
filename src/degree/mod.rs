//! Degree resolution: the second-degree cache and the resolver that
//! classifies member-to-member distances on top of the cluster.

pub mod cache;
pub mod resolver;
pub mod stats;

pub use cache::{SecondDegreeCache, second_degree_key};
pub use resolver::{DegreeResolver, DistanceReport, SecondDegreeSet};
pub use stats::{ResolverStats, ResolverStatsSnapshot};
