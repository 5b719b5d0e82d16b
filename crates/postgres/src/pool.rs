//! Connection pool (spec.md §4.F / §5): one pooled connection per request,
//! sized by `pool.min/max/max_lifetime` from configuration.

use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use pgcat_core::{Error, Result};
use std::time::Duration;
use tokio_postgres::NoTls;

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub dsn: String,
    pub min: usize,
    pub max: usize,
    pub max_lifetime: Duration,
}

pub fn build_pool(settings: &PoolSettings) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(settings.dsn.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: settings.max.max(settings.min).max(1),
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| Error::Unavailable(format!("failed to build connection pool: {e}")))
}

/// Acquires a connection, surfacing pool exhaustion as `Unavailable` per
/// spec.md §5 ("pool exhaustion -> PoolExhausted/503 after configurable
/// wait") rather than a raw deadpool error type leaking into resolvers.
pub async fn acquire(
    pool: &Pool,
    wait: Duration,
) -> Result<deadpool_postgres::Object> {
    tokio::time::timeout(wait, pool.get())
        .await
        .map_err(|_| Error::Unavailable("timed out waiting for a pooled connection".into()))?
        .map_err(|e| Error::Unavailable(format!("connection pool exhausted: {e}")))
}
