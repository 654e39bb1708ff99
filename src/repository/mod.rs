//! Data access layer (Repository pattern)

pub mod activity;
pub mod rule;

pub use activity::{ActivityRepository, ActivityRepositoryImpl};
pub use rule::{RuleRepository, RuleRepositoryImpl};

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pool: MySqlPool,
}

impl DbPool {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized from configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn inner(&self) -> &MySqlPool {
        &self.pool
    }
}
