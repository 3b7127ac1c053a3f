//! Bearer-token verification against the external identity provider.

pub mod middleware;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// The verified caller identity injected into authenticated requests.
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Maps a bearer token to a verified user.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> AppResult<VerifiedUser>;
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(rename = "localId")]
    local_id: String,
    email: Option<String>,
}

/// Identity-provider client performing an account lookup per token.
pub struct IdentityClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl IdentityClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl TokenVerifier for IdentityClient {
    async fn verify(&self, token: &str) -> AppResult<VerifiedUser> {
        let url = format!(
            "{}/v1/accounts:lookup?key={}",
            self.base_url.trim_end_matches('/'),
            self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("identity provider unreachable: {e}")))?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "identity provider rejected token");
            return Err(AppError::Auth("invalid or expired token".to_string()));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("identity provider response: {e}")))?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Auth("invalid or expired token".to_string()))?;

        Ok(VerifiedUser {
            user_id: user.local_id,
            email: user.email,
        })
    }
}
