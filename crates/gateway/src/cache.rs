//! HTTP cache validators for article reads
//!
//! Reads are revalidated on every request (`no-cache` plus a strong ETag),
//! mutation responses are never stored.

use axum::{
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use siga_common::errors::{AppError, Result};

const REVALIDATE: &str = "no-cache";
const NO_STORE: &str = "no-store";

/// Strong entity tag for a serialized body
pub fn entity_tag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

fn matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|candidate| candidate.trim())
        .any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
}

/// Serialize `value` as a revalidating read, answering 304 when the
/// client's copy is current
pub fn revalidated<T: Serialize>(headers: &HeaderMap, value: &T) -> Result<Response> {
    let body = serde_json::to_vec(value)?;
    let etag = entity_tag(&body);
    let etag_header = HeaderValue::from_str(&etag).map_err(|e| AppError::Internal {
        message: format!("Invalid ETag: {}", e),
    })?;

    if matches(headers, &etag) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(ETAG, etag_header), (CACHE_CONTROL, HeaderValue::from_static(REVALIDATE))],
        )
            .into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (ETAG, etag_header),
            (CACHE_CONTROL, HeaderValue::from_static(REVALIDATE)),
        ],
        body,
    )
        .into_response())
}

/// JSON response that must never be cached
pub fn no_store<T: Serialize>(status: StatusCode, value: T) -> Response {
    (status, [(CACHE_CONTROL, HeaderValue::from_static(NO_STORE))], Json(value)).into_response()
}

/// Empty response that must never be cached
pub fn no_store_empty(status: StatusCode) -> Response {
    (status, [(CACHE_CONTROL, HeaderValue::from_static(NO_STORE))]).into_response()
}
