//! Database repositories for data access layer

mod users;

pub use users::UserRepository;

use sqlx::PgPool;

/// Cheapest round trip that proves a pooled connection can be acquired and used.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(drop)
}
