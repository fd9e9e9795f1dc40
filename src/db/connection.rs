use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};

use crate::config::DatabaseConfig;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Builds the connection pool from explicit configuration. The pool is
/// constructed once at startup and handed to the catalog service; nothing
/// here is process-global.
pub fn build_pool(config: &DatabaseConfig) -> Result<PgPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(&config.url);
    Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .build(manager)
}
