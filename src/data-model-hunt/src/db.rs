use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::deadpool::Pool;

pub type PoolError = deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>;

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionPoolError {
    #[error("Failed to build connection pool: {0}")]
    BuildError(#[from] deadpool::managed::BuildError),
    #[error("Failed to establish initial database connection: {0}")]
    ConnectionError(#[from] PoolError),
}

/// Builds the diesel-async connection pool for `database_url`.
/// One connection is checked out immediately so an unreachable database fails at startup.
pub async fn establish_connection_pool(database_url: &str) -> Result<DbPool, ConnectionPoolError> {
    establish_sized_connection_pool(database_url, None).await
}

/// Same as `establish_connection_pool` with an explicit upper bound on pooled connections.
pub async fn establish_sized_connection_pool(
    database_url: &str,
    max_size: Option<usize>,
) -> Result<DbPool, ConnectionPoolError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let builder = Pool::builder(config);
    let builder = match max_size {
        Some(size) => builder.max_size(size),
        None => builder,
    };
    let pool = builder.build()?;

    let _conn = pool.get().await?;

    Ok(pool)
}
