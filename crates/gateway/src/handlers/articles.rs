//! Article handlers
//!
//! Reads are public and revalidated through ETags. Mutations require an
//! admin session and go through the article service only.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;

use crate::cache;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use siga_common::{
    articles::{ArticleFilter, ArticlePatch, NewArticle},
    auth::AdminSession,
    errors::{AppError, Result},
};

/// Listing filters; at most one may be given
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub theme_id: Option<String>,
    pub category: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<ArticleFilter> {
        match (self.theme_id, self.category) {
            (Some(_), Some(_)) => Err(AppError::InvalidFormat {
                message: "Filter by themeId or by category, not both".to_string(),
            }),
            (Some(theme_id), None) => Ok(ArticleFilter::theme(&theme_id)),
            (None, Some(category)) => Ok(ArticleFilter::Category(category)),
            (None, None) => Ok(ArticleFilter::All),
        }
    }
}

/// List articles, newest first
pub async fn list_articles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let filter = query.into_filter()?;
    let articles = state.articles.list(&filter).await?;

    cache::revalidated(&headers, &articles)
}

/// Get an article by id
pub async fn get_article(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let article = state.articles.get_by_id(&id).await?;

    cache::revalidated(&headers, &article)
}

/// Create an article
pub async fn create_article(
    session: AdminSession,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewArticle>,
) -> Result<Response> {
    tracing::debug!(subject = %session.subject, "Create requested");

    let article = state.articles.create(input).await?;

    Ok(cache::no_store(StatusCode::CREATED, article))
}

/// Partially update an article
pub async fn update_article(
    session: AdminSession,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<ArticlePatch>,
) -> Result<Response> {
    tracing::debug!(subject = %session.subject, article_id = %id, "Update requested");

    let article = state.articles.update(&id, patch).await?;

    Ok(cache::no_store(StatusCode::OK, article))
}

/// Delete an article
pub async fn delete_article(
    session: AdminSession,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response> {
    tracing::debug!(subject = %session.subject, article_id = %id, "Delete requested");

    state.articles.delete(&id).await?;

    Ok(cache::no_store_empty(StatusCode::NO_CONTENT))
}
