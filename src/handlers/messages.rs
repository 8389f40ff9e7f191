use axum::{Extension, Json, extract::State};

use crate::{
    error::Result,
    models::{message::PublicMessage, session::Session},
    services::chat as chat_service,
    state::AppState,
};

/// Returns the most recent messages, oldest first. Requires a session.
#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<PublicMessage>>> {
    let messages = chat_service::recent_history(state.store.as_ref()).await?;
    tracing::debug!(
        user_id = session.user_id,
        count = messages.len(),
        "Message history served"
    );
    Ok(Json(messages))
}
