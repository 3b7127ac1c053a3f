//! Audit-history endpoint.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::VerifiedUser;
use crate::error::AppResult;
use crate::model::History;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 10_000;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// `GET /{flow_id}/history` - newest first, `limit` clamped to 1..=10000.
pub async fn list(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    Query(query): Query<HistoryQuery>,
    Extension(_user): Extension<VerifiedUser>,
) -> AppResult<Json<Vec<History>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let entries = state.history.list(&flow_id, limit).await?;
    Ok(Json(entries))
}
