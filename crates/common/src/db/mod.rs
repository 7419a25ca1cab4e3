//! Database layer for the article store
//!
//! Provides:
//! - SeaORM entity models
//! - Postgres implementation of the article store
//! - Connection pool management
//! - Embedded schema migrations

pub mod models;
mod repository;

pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
///
/// Reads and writes share the primary so a read issued after a mutation
/// always observes it.
#[derive(Clone)]
pub struct DbPool {
    pub primary: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::StoreUnavailable {
                message: format!("Failed to connect to primary: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self::from_connection(primary))
    }

    /// Wrap an already established connection
    pub fn from_connection(primary: DatabaseConnection) -> Self {
        Self { primary }
    }

    /// Connection used for every query
    pub fn connection(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Apply the embedded migrations to the primary database
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::migrate!("./migrations")
            .run(self.primary.get_postgres_connection_pool())
            .await
            .map_err(|e| AppError::Internal {
                message: format!("Migration failed: {}", e),
            })?;

        info!("Database schema is up to date");
        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::StoreUnavailable {
                message: format!("Primary ping failed: {}", e),
            })?;

        Ok(())
    }
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);
    opts
}
