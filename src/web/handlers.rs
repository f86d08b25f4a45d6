use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::{Result, WebError, state::AppState};
use crate::core::{Connection, GraphDistance, MemberId};
use crate::degree::ResolverStatsSnapshot;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceRequest {
    pub source_id: MemberId,
    #[serde(default)]
    pub destination_ids: Vec<MemberId>,
}

/// Body of `POST /api/connections`: one edge, or one source with many
/// destinations.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ConnectionPayload {
    Single(Connection),
    Batch(ConnectionBatch),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionBatch {
    pub source_id: MemberId,
    pub destination_ids: Vec<MemberId>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ConnectionPayload {
    fn into_connections(self) -> Vec<Connection> {
        match self {
            ConnectionPayload::Single(connection) => vec![connection],
            ConnectionPayload::Batch(batch) => batch
                .destination_ids
                .into_iter()
                .map(|dest_id| Connection {
                    source_id: batch.source_id,
                    dest_id,
                    metadata: batch.metadata.clone(),
                })
                .collect(),
        }
    }
}

pub async fn healthcheck() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

pub async fn get_connections(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<Json<Vec<MemberId>>> {
    let member = parse_member(&member_id)?;
    let ctx = state.request_context();

    let connections = state.resolver.direct_connections(&ctx, member).await?;
    Ok(Json(connections))
}

pub async fn get_shared_connections(
    State(state): State<AppState>,
    Path((first_id, second_id)): Path<(String, String)>,
) -> Result<Json<Vec<MemberId>>> {
    let first = parse_member(&first_id)?;
    let second = parse_member(&second_id)?;
    let ctx = state.request_context();

    let shared = state
        .resolver
        .shared_connections(&ctx, first, second)
        .await?;
    Ok(Json(shared))
}

pub async fn post_distances(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DistanceRequest>, JsonRejection>,
) -> Result<Json<Vec<GraphDistance>>> {
    let Json(request) = payload.map_err(|rejection| WebError::input(rejection.body_text()))?;
    let ctx = state.request_context();

    let report = state
        .resolver
        .distances(&ctx, request.source_id, &request.destination_ids)
        .await?;
    Ok(Json(report.distances))
}

pub async fn post_connection(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ConnectionPayload>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(payload) = payload.map_err(|rejection| WebError::input(rejection.body_text()))?;
    let ctx = state.request_context();

    for connection in payload.into_connections() {
        state.resolver.store_connection(&ctx, &connection).await?;
    }
    Ok(StatusCode::CREATED)
}

pub async fn get_stats(State(state): State<AppState>) -> Json<ResolverStatsSnapshot> {
    Json(state.resolver.stats())
}

fn parse_member(raw: &str) -> Result<MemberId> {
    raw.parse::<MemberId>().map_err(WebError::from)
}
