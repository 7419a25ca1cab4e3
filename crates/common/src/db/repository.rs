//! Postgres article store

use crate::articles::{ArticlePatch, ArticleStore};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set, SqlErr,
};

/// Repository for article data access
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.connection()
    }

    async fn fetch(&self, query: Select<ArticleEntity>) -> Result<Vec<Article>> {
        query
            .order_by_desc(ArticleColumn::Date)
            .order_by_desc(ArticleColumn::CreatedAt)
            .order_by_desc(ArticleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}

fn insert_error(id: String, err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateId { id },
        _ => err.into(),
    }
}

#[async_trait]
impl ArticleStore for Repository {
    async fn insert(&self, article: Article) -> Result<Article> {
        let id = article.id.clone();

        let model = ArticleActiveModel {
            id: Set(article.id),
            title: Set(article.title),
            summary: Set(article.summary),
            content: Set(article.content),
            category: Set(article.category),
            theme_id: Set(article.theme_id),
            read_time: Set(article.read_time),
            date: Set(article.date),
            created_at: Set(article.created_at),
            updated_at: Set(article.updated_at),
            version: Set(article.version),
        };

        model
            .insert(self.conn())
            .await
            .map_err(|e| insert_error(id, e))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id.to_string())
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list(&self) -> Result<Vec<Article>> {
        self.fetch(ArticleEntity::find()).await
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Article>> {
        self.fetch(ArticleEntity::find().filter(ArticleColumn::Category.eq(category)))
            .await
    }

    async fn list_by_theme(&self, theme_id: &str) -> Result<Vec<Article>> {
        self.fetch(ArticleEntity::find().filter(ArticleColumn::ThemeId.eq(theme_id)))
            .await
    }

    async fn update(&self, id: &str, patch: ArticlePatch) -> Result<Article> {
        let mut query = ArticleEntity::update_many()
            .col_expr(ArticleColumn::UpdatedAt, Expr::value(now()))
            .col_expr(
                ArticleColumn::Version,
                Expr::col(ArticleColumn::Version).add(1),
            )
            .filter(ArticleColumn::Id.eq(id));

        if let Some(title) = patch.title {
            query = query.col_expr(ArticleColumn::Title, Expr::value(title));
        }
        if let Some(summary) = patch.summary {
            query = query.col_expr(ArticleColumn::Summary, Expr::value(summary));
        }
        if let Some(content) = patch.content {
            query = query.col_expr(ArticleColumn::Content, Expr::value(content));
        }
        if let Some(category) = patch.category {
            query = query.col_expr(ArticleColumn::Category, Expr::value(category));
        }
        if let Some(theme_id) = patch.theme_id {
            query = query.col_expr(ArticleColumn::ThemeId, Expr::value(theme_id));
        }
        if let Some(read_time) = patch.read_time {
            query = query.col_expr(ArticleColumn::ReadTime, Expr::value(read_time));
        }
        if let Some(date) = patch.date {
            query = query.col_expr(ArticleColumn::Date, Expr::value(date));
        }
        if let Some(version) = patch.version {
            query = query.filter(ArticleColumn::Version.eq(version));
        }

        let mut updated = query.exec_with_returning(self.conn()).await?;
        if let Some(article) = updated.pop() {
            return Ok(article);
        }

        // Nothing matched: either the row is gone or the version moved on
        let current = ArticleEntity::find_by_id(id.to_string())
            .one(self.conn())
            .await?;

        match (current, patch.version) {
            (Some(current), Some(expected)) => Err(AppError::Conflict {
                id: id.to_string(),
                expected,
                actual: current.version,
            }),
            _ => Err(AppError::ArticleNotFound { id: id.to_string() }),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = ArticleEntity::delete_by_id(id.to_string())
            .exec(self.conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::ArticleNotFound { id: id.to_string() });
        }

        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        ArticleEntity::find()
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
