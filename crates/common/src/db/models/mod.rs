//! SeaORM entity models
//!
//! Database entities for the article store

mod article;

pub use article::{
    now, truncate, ActiveModel as ArticleActiveModel, Column as ArticleColumn,
    Entity as ArticleEntity, Model as Article,
};
