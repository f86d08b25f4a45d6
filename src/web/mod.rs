//! HTTP surface over the degree resolver.
//!
//! Errors leave the service as `{"error": ..., "code": ...}` with a status
//! derived from the underlying [`GraphError`].

pub mod app;
pub mod handlers;
pub mod state;

pub use app::build_router;
pub use state::AppState;

use crate::core::GraphError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Graph(GraphError),
    Input(String),
}

impl From<GraphError> for WebError {
    fn from(err: GraphError) -> Self {
        WebError::Graph(err)
    }
}

impl WebError {
    pub fn input(message: impl Into<String>) -> Self {
        WebError::Input(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Input(_) | WebError::Graph(GraphError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            WebError::Graph(GraphError::StoreTimeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            WebError::Graph(GraphError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            WebError::Graph(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            WebError::Input(_) | WebError::Graph(GraphError::InvalidInput(_)) => "invalid_input",
            WebError::Graph(GraphError::StoreTimeout(_)) => "store_timeout",
            WebError::Graph(GraphError::StoreUnavailable(_)) => "store_unavailable",
            WebError::Graph(GraphError::PartitionNotOwned { .. }) => "partition_not_owned",
            WebError::Graph(GraphError::ConfigInvariantViolation(_)) => "config_error",
            WebError::Graph(_) => "internal_error",
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let message = match self {
            WebError::Graph(err) => err.to_string(),
            WebError::Input(msg) => msg,
        };

        let body = Json(ErrorResponse {
            error: message,
            code,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::WebError;
    use crate::core::GraphError;
    use axum::http::StatusCode;

    #[test]
    fn graph_errors_map_to_statuses() {
        let cases = [
            (GraphError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (GraphError::StoreTimeout("slow".into()), StatusCode::GATEWAY_TIMEOUT),
            (
                GraphError::StoreUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GraphError::PartitionNotOwned {
                    node_id: "node-0".into(),
                    partition_id: 12,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GraphError::ConfigInvariantViolation("gap".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(WebError::from(err).status(), expected);
        }
        assert_eq!(WebError::input("nope").status(), StatusCode::BAD_REQUEST);
    }
}
