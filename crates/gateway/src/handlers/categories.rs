//! Category catalog handler

use axum::{extract::State, http::HeaderMap, response::Response};

use crate::cache;
use crate::AppState;
use siga_common::errors::Result;

/// List the configured categories
pub async fn list_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    cache::revalidated(&headers, &state.articles.catalog().entries())
}
