//! Article service
//!
//! The single entry point for article reads and mutations. Handles:
//! 1. Input validation against the category catalog
//! 2. Id generation, with one retry on collision
//! 3. Ordering policy for listings
//! 4. Logging and metrics for every mutation

use super::catalog::{CategoryCatalog, ALL_THEMES};
use super::ids::{IdGenerator, TimeOrderedIds};
use super::store::ArticleStore;
use super::validation::{validate_id, ArticlePatch, NewArticle};
use crate::db::models::{now, Article};
use crate::errors::{AppError, Result};
use crate::metrics;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Generated ids tried before giving up
const ID_ATTEMPTS: u32 = 2;

/// Which articles a listing returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleFilter {
    All,
    /// Articles with this `themeId`
    Theme(String),
    /// Articles with this `category` label
    Category(String),
}

impl ArticleFilter {
    /// Filter for a theme key, where `all` means no filter
    pub fn theme(theme_id: &str) -> Self {
        if theme_id == ALL_THEMES {
            ArticleFilter::All
        } else {
            ArticleFilter::Theme(theme_id.to_string())
        }
    }
}

pub struct ArticleService {
    store: Arc<dyn ArticleStore>,
    catalog: Arc<CategoryCatalog>,
    ids: Arc<dyn IdGenerator>,
}

impl ArticleService {
    pub fn new(store: Arc<dyn ArticleStore>, catalog: Arc<CategoryCatalog>) -> Self {
        Self::with_id_generator(store, catalog, Arc::new(TimeOrderedIds))
    }

    pub fn with_id_generator(
        store: Arc<dyn ArticleStore>,
        catalog: Arc<CategoryCatalog>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            catalog,
            ids,
        }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// The underlying store, for health checks
    pub fn store(&self) -> &dyn ArticleStore {
        self.store.as_ref()
    }

    /// Validate and persist a new article
    pub async fn create(&self, input: NewArticle) -> Result<Article> {
        let draft = input
            .into_draft(&self.catalog)
            .map_err(|violations| AppError::ValidationFailed { violations })?;

        let created_at = now();

        for attempt in 1..=ID_ATTEMPTS {
            let article = draft.clone().into_article(self.ids.next_id(), created_at);

            match self.store.insert(article).await {
                Ok(created) => {
                    info!(
                        article_id = %created.id,
                        theme_id = %created.theme_id,
                        "Article created"
                    );
                    metrics::record_article_mutation("create", "success");
                    return Ok(created);
                }
                Err(AppError::DuplicateId { id }) => {
                    warn!(article_id = %id, attempt, "Generated article id already taken");
                }
                Err(e) => {
                    metrics::record_article_mutation("create", "error");
                    return Err(e);
                }
            }
        }

        metrics::record_article_mutation("create", "error");
        Err(AppError::IdGenerationFailed {
            attempts: ID_ATTEMPTS,
        })
    }

    /// Apply a partial update; only the provided fields are validated
    pub async fn update(&self, id: &str, patch: ArticlePatch) -> Result<Article> {
        validate_id(id).map_err(AppError::invalid)?;

        let patch = patch
            .normalize(&self.catalog)
            .map_err(|violations| AppError::ValidationFailed { violations })?;

        if patch.is_empty() {
            debug!(article_id = %id, "Empty patch, touching updatedAt only");
        }

        let result = self.store.update(id, patch).await;

        match result {
            Ok(ref updated) => {
                info!(article_id = %id, version = updated.version, "Article updated");
                metrics::record_article_mutation("update", "success");
            }
            Err(ref e) => {
                metrics::record_article_mutation("update", outcome(e));
            }
        }

        result
    }

    /// Hard delete
    pub async fn delete(&self, id: &str) -> Result<()> {
        validate_id(id).map_err(AppError::invalid)?;

        let result = self.store.delete(id).await;

        match result {
            Ok(()) => {
                info!(article_id = %id, "Article deleted");
                metrics::record_article_mutation("delete", "success");
            }
            Err(ref e) => {
                metrics::record_article_mutation("delete", outcome(e));
            }
        }

        result
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Article> {
        validate_id(id).map_err(AppError::invalid)?;

        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::ArticleNotFound { id: id.to_string() })
    }

    /// Articles matching the filter, newest first
    pub async fn list(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let articles = match filter {
            ArticleFilter::All => self.store.list().await?,
            ArticleFilter::Theme(theme_id) => self.store.list_by_theme(theme_id).await?,
            ArticleFilter::Category(category) => self.store.list_by_category(category).await?,
        };

        metrics::record_listing(articles.len());
        Ok(articles)
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count().await
    }
}

fn outcome(err: &AppError) -> &'static str {
    match err {
        AppError::ArticleNotFound { .. } => "not_found",
        AppError::Conflict { .. } => "conflict",
        _ => "error",
    }
}
