//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  Database   │  (pool handle + retry policy)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries over a borrowed connection)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Database request/response structures
//! - [`errors`]: Database-specific error types
//!
//! ## Example Usage
//!
//! ```ignore
//! use fintrack::db::handlers::{Categories, Repository};
//!
//! async fn example(db: &fintrack::db::Database) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = db.begin().await?;
//!     let mut categories = Categories::new(&mut tx);
//!
//!     let deletion = categories.delete_reassigning(category_id).await?;
//!     println!("moved {} transactions", deletion.reassigned);
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod handlers;
pub mod models;

use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction, pool::PoolConnection, postgres::PgPoolOptions};
use tracing::info;

use crate::{config::DatabaseConfig, retry::RetryPolicy};
use errors::{DbError, is_transient};

/// Connection-pool handle carrying the retry policy applied to every acquire.
///
/// Built once at startup and cloned into the application state.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    retry: RetryPolicy,
}

impl Database {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// Open the pool described by `config`, retrying transient connection failures.
    pub async fn connect(config: &DatabaseConfig, retry: RetryPolicy) -> Result<Self, DbError> {
        let settings = &config.pool;
        let optional = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

        let options = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .idle_timeout(optional(settings.idle_timeout_secs))
            .max_lifetime(optional(settings.max_lifetime_secs));

        let pool = retry
            .run_if("connect database", is_transient, || options.clone().connect(&config.url))
            .await?;

        info!(max_connections = settings.max_connections, "Database pool ready");
        Ok(Self::new(pool, retry))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Check out a pooled connection.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, DbError> {
        Ok(self.retry.run_if("acquire connection", is_transient, || self.pool.acquire()).await?)
    }

    /// Start a transaction on a pooled connection.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, DbError> {
        Ok(self.retry.run_if("begin transaction", is_transient, || self.pool.begin()).await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Get the fintrack database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}
