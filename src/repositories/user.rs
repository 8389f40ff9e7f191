use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;

use crate::{
    error::{AppError, Result},
    models::user::User,
};

/// Inserts a new user. A taken username comes back as `AppError::Conflict`.
pub async fn create_user(pool: &Pool, username: &str, password_hash: &str) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO users (username, password)
            VALUES ($1, $2)
            RETURNING id, username, password, created_at
            "#,
            &[&username, &password_hash],
        )
        .await
        .map_err(|e| {
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                AppError::Conflict("Username already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;
    User::try_from(&row)
}

/// Finds a user by their username.
pub async fn find_by_username(pool: &Pool, username: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, username, password, created_at
            FROM users
            WHERE username = $1
            "#,
            &[&username],
        )
        .await?;
    row.map(|r| User::try_from(&r)).transpose()
}
