//! In-memory article store
//!
//! Same contract as the Postgres repository. Used by tests and by the
//! `memory` store backend for local development.

use super::store::{newest_first, ArticleStore};
use super::validation::ArticlePatch;
use crate::db::models::{now, Article};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    articles: RwLock<HashMap<String, Article>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select<F>(&self, keep: F) -> Vec<Article>
    where
        F: Fn(&Article) -> bool,
    {
        let articles = self.articles.read().await;
        let mut selected: Vec<Article> = articles.values().filter(|a| keep(a)).cloned().collect();
        selected.sort_by(newest_first);
        selected
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn insert(&self, article: Article) -> Result<Article> {
        let mut articles = self.articles.write().await;

        if articles.contains_key(&article.id) {
            return Err(AppError::DuplicateId { id: article.id });
        }

        articles.insert(article.id.clone(), article.clone());
        Ok(article)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Article>> {
        Ok(self.articles.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Article>> {
        Ok(self.select(|_| true).await)
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Article>> {
        Ok(self.select(|a| a.category == category).await)
    }

    async fn list_by_theme(&self, theme_id: &str) -> Result<Vec<Article>> {
        Ok(self.select(|a| a.theme_id == theme_id).await)
    }

    async fn update(&self, id: &str, patch: ArticlePatch) -> Result<Article> {
        let mut articles = self.articles.write().await;

        let article = articles
            .get_mut(id)
            .ok_or_else(|| AppError::ArticleNotFound { id: id.to_string() })?;

        if let Some(expected) = patch.version {
            if expected != article.version {
                return Err(AppError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual: article.version,
                });
            }
        }

        patch.apply_to(article);
        article.updated_at = now();
        article.version += 1;

        Ok(article.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.articles
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::ArticleNotFound { id: id.to_string() })
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.articles.read().await.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn article(id: &str, theme_id: &str, day: u32) -> Article {
        let date = Utc
            .with_ymd_and_hms(2024, 12, day, 12, 0, 0)
            .unwrap()
            .fixed_offset();
        Article {
            id: id.to_string(),
            title: format!("Artigo {}", id),
            summary: "Resumo".into(),
            content: "Conteúdo".into(),
            category: "BRICS".into(),
            theme_id: theme_id.to_string(),
            read_time: "10 min".into(),
            date,
            created_at: date,
            updated_at: date,
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryArticleStore::new();
        store.insert(article("a", "brics", 22)).await.unwrap();
        let err = store.insert(article("a", "brics", 23)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateId { id } if id == "a"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let store = MemoryArticleStore::new();
        for (id, day) in [("b", 23), ("c", 25), ("a", 22)] {
            store.insert(article(id, "brics", day)).await.unwrap();
        }
        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_equal_dates_break_ties_deterministically() {
        let store = MemoryArticleStore::new();
        let mut older = article("x", "brics", 22);
        older.created_at = older.created_at - Duration::hours(1);
        store.insert(older).await.unwrap();
        store.insert(article("y", "brics", 22)).await.unwrap();
        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["y", "x"]);
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let store = MemoryArticleStore::new();
        store.insert(article("a", "brics", 22)).await.unwrap();

        let patch = ArticlePatch {
            title: Some("Novo".into()),
            version: Some(1),
            ..Default::default()
        };
        let updated = store.update("a", patch.clone()).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.title, "Novo");

        let err = store.update("a", patch).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Conflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let store = MemoryArticleStore::new();
        assert!(store.get_by_id("nope").await.unwrap().is_none());
        assert!(matches!(
            store.update("nope", ArticlePatch::default()).await,
            Err(AppError::ArticleNotFound { .. })
        ));
        assert!(matches!(
            store.delete("nope").await,
            Err(AppError::ArticleNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_filters() {
        let store = MemoryArticleStore::new();
        store.insert(article("a", "brics", 22)).await.unwrap();
        let mut other = article("b", "ww2", 23);
        other.category = "Segunda Guerra".into();
        store.insert(other).await.unwrap();

        assert_eq!(store.list_by_theme("ww2").await.unwrap().len(), 1);
        assert_eq!(store.list_by_category("BRICS").await.unwrap()[0].id, "a");
        assert!(store.list_by_theme("rockefeller").await.unwrap().is_empty());
    }
}
