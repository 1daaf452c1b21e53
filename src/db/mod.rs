pub mod audit;
pub mod read_model;
pub mod rules;
pub mod stipends;
pub mod transactions;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::Config;

/// Creates the bounded connection pool. The pool is the only shared
/// resource in the process; everything else is injected per component.
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.request_timeout_secs))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}
