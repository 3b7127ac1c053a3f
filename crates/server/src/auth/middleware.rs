//! Authentication gate.
//!
//! Flow execution stays public: `.ics` endpoints are consumed by
//! external calendar clients that cannot present a bearer token. Every
//! other route requires a verified identity, which is injected into the
//! request extensions for handlers to pick up.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use crate::auth::extract_bearer;
use crate::error::AppError;
use crate::state::AppState;

fn is_public(method: &Method, path: &str) -> bool {
    path == "/health" || (method == Method::GET && path.ends_with(".ics"))
}

pub async fn auth_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_public(request.method(), request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = extract_bearer(request.headers())
        .ok_or_else(|| AppError::Auth("missing authentication token".to_string()))?
        .to_string();

    let user = state.verifier.verify(&token).await?;
    tracing::debug!(user_id = %user.user_id, "authenticated caller");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
