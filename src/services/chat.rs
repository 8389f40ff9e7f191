use crate::{
    error::Result,
    models::message::{Message, PublicMessage},
    store::ChatStore,
    validation::message::validate_message,
};

/// How many messages `GET /messages` returns.
pub const HISTORY_LIMIT: usize = 100;

/// Validates and persists a message from an authenticated author.
pub async fn post_message(
    store: &dyn ChatStore,
    user_id: i64,
    username: &str,
    text: &str,
) -> Result<Message> {
    let text = validate_message(text)?;
    let message = store.append_message(user_id, username, text).await?;
    tracing::debug!(message_id = message.id, user_id, "Message stored");
    Ok(message)
}

/// The most recent messages, oldest first.
pub async fn recent_history(store: &dyn ChatStore) -> Result<Vec<PublicMessage>> {
    let messages = store.recent_messages(HISTORY_LIMIT).await?;
    Ok(messages.into_iter().map(PublicMessage::from).collect())
}
