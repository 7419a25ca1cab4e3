//! Admin login handlers

use axum::{extract::State, http::StatusCode, response::Response, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache;
use crate::extract::ApiJson;
use crate::AppState;
use siga_common::{auth::AdminSession, errors::Result, metrics};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub secret: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

/// Exchange the admin secret for a session token
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response> {
    let result = state.guard.authenticate(&request.secret);
    metrics::record_login(result.is_ok());

    let token = result?;
    tracing::info!(expires_at = %token.expires_at, "Admin session issued");

    Ok(cache::no_store(StatusCode::OK, token))
}

/// Describe the presented session
pub async fn session(session: AdminSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        subject: session.subject,
        expires_at: session.expires_at,
    })
}
