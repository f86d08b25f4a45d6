use super::error::GraphError;

/// A fan-out source whose contribution was dropped from an aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    /// `node-1` for a whole node, `node-1/partition-12` for a single partition.
    pub source: String,
    pub error: GraphError,
}

impl SkippedSource {
    pub fn new(source: impl Into<String>, error: GraphError) -> Self {
        Self {
            source: source.into(),
            error,
        }
    }
}

/// Result of a best-effort aggregation.
///
/// `value` holds everything that was gathered; `skipped` lists the sources
/// that failed and were left out, so callers can tell a complete answer from
/// a degraded one without reading logs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BestEffort<T> {
    pub value: T,
    pub skipped: Vec<SkippedSource>,
}

impl<T> BestEffort<T> {
    pub fn complete(value: T) -> Self {
        Self {
            value,
            skipped: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn skip(&mut self, source: impl Into<String>, error: GraphError) {
        self.skipped.push(SkippedSource::new(source, error));
    }

    pub fn into_parts(self) -> (T, Vec<SkippedSource>) {
        (self.value, self.skipped)
    }
}
