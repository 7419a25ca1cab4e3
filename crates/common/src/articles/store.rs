//! Article store abstraction
//!
//! The store exclusively owns the durable representation of articles. Only
//! the article service calls it.

use super::validation::ArticlePatch;
use crate::db::models::Article;
use crate::errors::Result;
use async_trait::async_trait;
use std::cmp::Ordering;

/// Durable article storage
///
/// Listings are ordered newest first by `date`; ties fall back to
/// `created_at` then `id`, both descending.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a new record, failing with `DuplicateId` if the id is taken
    async fn insert(&self, article: Article) -> Result<Article>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Article>>;

    async fn list(&self) -> Result<Vec<Article>>;

    async fn list_by_category(&self, category: &str) -> Result<Vec<Article>>;

    async fn list_by_theme(&self, theme_id: &str) -> Result<Vec<Article>>;

    /// Apply a validated patch, refresh `updated_at` and bump `version`
    ///
    /// Fails with `ArticleNotFound` when absent and with `Conflict` when the
    /// patch carries a version that is not the current one.
    async fn update(&self, id: &str, patch: ArticlePatch) -> Result<Article>;

    /// Hard delete, failing with `ArticleNotFound` when absent
    async fn delete(&self, id: &str) -> Result<()>;

    async fn count(&self) -> Result<u64>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and readiness output
    fn backend(&self) -> &'static str;
}

/// Listing order shared by every store
pub(crate) fn newest_first(a: &Article, b: &Article) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}
