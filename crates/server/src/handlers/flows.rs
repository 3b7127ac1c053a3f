//! Flow endpoints: execution, definition reads, listing, upsert, delete.

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::VerifiedUser;
use crate::error::{AppError, AppResult};
use crate::handlers::caller_address;
use crate::model::{Flow, FlowHead};
use crate::orchestrator::ExecuteOptions;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteQuery {
    #[serde(default)]
    pub verbose: bool,

    #[serde(default = "default_debug")]
    pub debug: bool,
}

fn default_debug() -> bool {
    true
}

/// `GET /{flow_id}.ics` and `GET /{flow_id}.json`.
///
/// The `.ics` form runs the execution pipeline and is public; the
/// `.json` form returns the stored definition to its owner only.
pub async fn flow_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
    Query(query): Query<ExecuteQuery>,
    request: Request,
) -> AppResult<Response> {
    if let Some(flow_id) = file.strip_suffix(".ics") {
        return execute_flow(&state, flow_id, query, request.headers()).await;
    }

    if let Some(flow_id) = file.strip_suffix(".json") {
        return flow_json(&state, flow_id, request).await;
    }

    Err(AppError::NotFound(format!("no such resource '{file}'")))
}

async fn execute_flow(
    state: &AppState,
    flow_id: &str,
    query: ExecuteQuery,
    headers: &HeaderMap,
) -> AppResult<Response> {
    let output = state
        .orchestrator
        .execute(
            flow_id,
            ExecuteOptions {
                debug: query.debug,
                verbose: query.verbose,
                caller_address: caller_address(headers),
            },
        )
        .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/calendar"),
    );

    if let Ok(count) = HeaderValue::from_str(&output.debug_messages.len().to_string()) {
        response_headers.insert(HeaderName::from_static("x-debug-message-count"), count);
    }
    for (i, message) in output.debug_messages.iter().enumerate() {
        let name = HeaderName::from_bytes(format!("x-debug-message-{}", i + 1).as_bytes());
        // Sanitized to a valid header value, so the numbered sequence has
        // no gaps and always agrees with the count.
        if let (Ok(name), Ok(value)) = (name, HeaderValue::from_str(&header_safe(message))) {
            response_headers.insert(name, value);
        }
    }

    Ok((StatusCode::OK, response_headers, output.calendar).into_response())
}

/// Replace characters that cannot appear in a header value with spaces.
fn header_safe(message: &str) -> String {
    message
        .chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { ' ' })
        .collect()
}

async fn flow_json(state: &AppState, flow_id: &str, request: Request) -> AppResult<Response> {
    let user = request
        .extensions()
        .get::<VerifiedUser>()
        .ok_or_else(|| AppError::Auth("missing authentication token".to_string()))?;

    let flow = state.flows.find_by_id(flow_id).await?;
    if flow.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "you do not own this flow".to_string(),
        ));
    }

    Ok(Json(flow).into_response())
}

/// `GET /flows` - flows owned by the caller, without step bodies.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
) -> AppResult<Json<Vec<FlowHead>>> {
    let heads = state.flows.list_by_owner(&user.user_id).await?;
    Ok(Json(heads))
}

/// `POST /flows` - upsert a flow owned by the caller.
/// 201 when newly created, 200 when an existing flow was matched.
pub async fn upsert(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
    headers: HeaderMap,
    Json(flow): Json<Flow>,
) -> AppResult<Response> {
    let outcome = state
        .orchestrator
        .upsert_flow(flow, &user.user_id, caller_address(&headers))
        .await?;

    let status = if outcome.created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, outcome.to_string()).into_response())
}

/// `DELETE /{flow_id}` - owner-scoped delete.
pub async fn delete(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    Extension(user): Extension<VerifiedUser>,
    headers: HeaderMap,
) -> AppResult<String> {
    let deleted = state
        .orchestrator
        .delete_flow(&flow_id, &user.user_id, caller_address(&headers))
        .await?;

    Ok(format!("deleted {deleted}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_safe_passes_printable_ascii() {
        assert_eq!(header_safe("executed step 3"), "executed step 3");
    }

    #[test]
    fn test_header_safe_replaces_control_and_non_ascii() {
        assert_eq!(header_safe("line1\nline2"), "line1 line2");
        assert_eq!(header_safe("caf\u{e9}\r\u{0}"), "caf   ");
        assert!(HeaderValue::from_str(&header_safe("a\nb\u{7f}c")).is_ok());
    }
}
