use deadpool_postgres::Pool;

use crate::{error::Result, models::message::Message};

/// Appends a message; `created_at` is assigned by the database.
pub async fn insert_message(
    pool: &Pool,
    user_id: i64,
    username: &str,
    text: &str,
) -> Result<Message> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO messages (user_id, username, message)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, username, message, created_at
            "#,
            &[&user_id, &username, &text],
        )
        .await?;
    Message::try_from(&row)
}

/// Returns the `limit` most recent messages, oldest first.
pub async fn list_recent(pool: &Pool, limit: i64) -> Result<Vec<Message>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT id, user_id, username, message, created_at
            FROM (
                SELECT id, user_id, username, message, created_at
                FROM messages
                ORDER BY created_at DESC, id DESC
                LIMIT $1
            ) recent
            ORDER BY created_at ASC, id ASC
            "#,
            &[&limit],
        )
        .await?;
    rows.iter().map(Message::try_from).collect()
}
