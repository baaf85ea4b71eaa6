use kubeapps_core::models::User;
use kubeapps_core::retry::{retry_recoverable, RetryPolicy};
use kubeapps_core::AppError;
use sqlx::{PgPool, Postgres};

/// Repository for the `users` table
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
    policy: RetryPolicy,
}

impl UserRepository {
    pub fn new(pool: PgPool, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    /// List all users ordered by id
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let pool = &self.pool;
        retry_recoverable(
            || async move {
                sqlx::query_as::<Postgres, User>(
                    "SELECT id, name, email, created_at FROM users ORDER BY id",
                )
                .fetch_all(pool)
                .await
                .map_err(AppError::from)
            },
            &self.policy,
        )
        .await
    }

    /// Get user by id
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = id))]
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let pool = &self.pool;
        retry_recoverable(
            || async move {
                sqlx::query_as::<Postgres, User>(
                    "SELECT id, name, email, created_at FROM users WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(pool)
                .await
                .map_err(AppError::from)
            },
            &self.policy,
        )
        .await
    }

    /// Insert a user. A duplicate email is a permanent `Conflict` and is never retried.
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "insert"))]
    pub async fn add_user(&self, name: &str, email: &str) -> Result<User, AppError> {
        let pool = &self.pool;
        let result = retry_recoverable(
            || async move {
                sqlx::query_as::<Postgres, User>(
                    r#"
                    INSERT INTO users (name, email)
                    VALUES ($1, $2)
                    RETURNING id, name, email, created_at
                    "#,
                )
                .bind(name)
                .bind(email)
                .fetch_one(pool)
                .await
                .map_err(AppError::from)
            },
            &self.policy,
        )
        .await;

        match result {
            Err(AppError::Conflict(_)) => {
                Err(AppError::Conflict("Email already exists".to_string()))
            }
            other => other,
        }
    }

    /// Delete a user by id. Returns `NotFound` when no row matched.
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "delete", db.record_id = id))]
    pub async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        let pool = &self.pool;
        let rows = retry_recoverable(
            || async move {
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(id)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
                    .map_err(AppError::from)
            },
            &self.policy,
        )
        .await?;

        if rows == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
