use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::session::Session,
    state::AppState,
};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session_id";

/// Extracts the session token from the request cookies.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
///
/// # Returns
///
/// An `Option` containing the session ID if found.
pub fn extract_session_token(cookies: &Cookies) -> Option<Uuid> {
    cookies
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// Resolves the caller's session, if any. Expired sessions are deleted and
/// treated as absent.
pub async fn current_session(state: &AppState, cookies: &Cookies) -> Result<Option<Session>> {
    let Some(session_id) = extract_session_token(cookies) else {
        return Ok(None);
    };

    let Some(session) = state.sessions.load(session_id).await? else {
        tracing::debug!("❌ Unknown session: {}", session_id);
        return Ok(None);
    };

    if session.is_expired() {
        tracing::warn!("❌ Session expired for user: {}", session.user_id);
        if let Err(e) = state.sessions.destroy(session_id).await {
            tracing::warn!("Failed to delete expired session: {}", e);
        }
        return Ok(None);
    }

    Ok(Some(session))
}

/// A middleware that requires a valid session to be present.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response`, or `AppError::NotAuthenticated` (401) without a session.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    tracing::debug!("🔐 Checking authentication...");

    let session = current_session(&state, &cookies)
        .await?
        .ok_or(AppError::NotAuthenticated)?;

    tracing::debug!("✅ User authenticated: {}", session.user_id);

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
