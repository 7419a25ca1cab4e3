//! Siga o Dinheiro Common Library
//!
//! Shared code for the gateway and the seeding CLI including:
//! - Article record model, category catalog and validation
//! - Article store trait with Postgres and in-memory adapters
//! - Article service (the single entry point for mutations)
//! - Admin session guard
//! - Error types and handling
//! - Configuration management
//! - Metrics

pub mod articles;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use articles::{Article, ArticleFilter, ArticleService, ArticleStore};
pub use config::AppConfig;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
