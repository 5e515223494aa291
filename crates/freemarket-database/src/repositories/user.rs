//! User repository implementation.

use sqlx::{PgConnection, PgPool};

use freemarket_core::result::AppResult;
use freemarket_core::types::UserId;
use freemarket_entity::user::User;

use super::db_err;

/// Repository for user records.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID on the given connection.
    pub async fn find_in(conn: &mut PgConnection, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| db_err("Failed to find user", e))
    }

    /// Create a user with an already-hashed password.
    pub async fn create(&self, email: &str, password_hash: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) \
             RETURNING id, email, password_hash, created_at, updated_at",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("Failed to create user", e))
    }
}
