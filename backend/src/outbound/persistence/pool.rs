//! Async PostgreSQL connection pool.

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection, RunError};
use thiserror::Error;

/// Errors surfaced by the connection pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool could not be constructed at startup.
    #[error("failed to build connection pool: {0}")]
    Build(String),
    /// No connection could be checked out within the timeout.
    #[error("failed to check out connection: {0}")]
    Checkout(#[from] RunError),
}

/// Tunables for [`DbPool::connect`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Maximum simultaneous connections.
    pub max_size: u32,
    /// Checkout timeout.
    pub connection_timeout: std::time::Duration,
}

impl PoolConfig {
    /// Default tunables for the given database URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            connection_timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// Shared handle to the bb8 pool of async Diesel connections.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build a pool from the given configuration.
    ///
    /// # Errors
    /// Returns [`PoolError::Build`] when the pool cannot be constructed.
    pub async fn connect(config: &PoolConfig) -> Result<Self, PoolError> {
        let manager =
            AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.database_url.clone());
        let inner = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|error| PoolError::Build(error.to_string()))?;
        Ok(Self { inner })
    }

    /// Check out a connection.
    ///
    /// # Errors
    /// Returns [`PoolError::Checkout`] when no connection is available
    /// within the timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        Ok(self.inner.get().await?)
    }
}

impl std::fmt::Debug for DbPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbPool")
            .field("state", &self.inner.state())
            .finish()
    }
}
