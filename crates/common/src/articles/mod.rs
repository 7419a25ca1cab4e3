//! Article domain
//!
//! The article record model, the category catalog it is validated against,
//! the store abstraction that owns the durable representation and the
//! service that mediates every read and mutation.

mod catalog;
mod ids;
mod memory;
mod service;
mod store;
mod validation;

pub use crate::db::models::Article;
pub use catalog::{default_entries, CategoryCatalog, CategoryEntry, ALL_THEMES};
pub use ids::{IdGenerator, TimeOrderedIds};
pub use memory::MemoryArticleStore;
pub use service::{ArticleFilter, ArticleService};
pub use store::ArticleStore;
pub use validation::{validate_id, ArticleDraft, ArticlePatch, NewArticle, Violation};
