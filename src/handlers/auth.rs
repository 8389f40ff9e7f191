use axum::{
    extract::{FromRequest, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::{SESSION_COOKIE, current_session, extract_session_token},
    models::{session::Session, user::User},
    services::auth as auth_service,
    state::AppState,
    validation::auth::*,
};

/// `Json` whose rejections come back as a 400 with an `{"error": ...}` body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// The request payload for registration and login.
///
/// Absent and `null` fields both deserialize as `None` and fail validation
/// with a 400.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsRequest {
    fn into_parts(self) -> (String, String) {
        (
            self.username.unwrap_or_default(),
            self.password.unwrap_or_default(),
        )
    }
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Returned by register and login.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub username: String,
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAuthResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

/// Creates a session cookie with the given value and max age.
fn create_session_cookie(value: String, max_age_days: i64, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);

    cookie.set_http_only(true);
    if secure {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_days * 86400));
    cookie.set_path("/");

    cookie
}

/// Stores a new session for `user` and sets its cookie.
async fn start_session(state: &AppState, cookies: &Cookies, user: &User) -> Result<()> {
    let session_id = Uuid::new_v4();
    let session = Session::new(
        user.id,
        user.username.clone(),
        state.config.session_duration_days,
    );

    state
        .sessions
        .save(session_id, &session, state.config.session_ttl_secs())
        .await?;

    cookies.add(create_session_cookie(
        session_id.to_string(),
        state.config.session_duration_days,
        state.config.secure_cookies,
    ));
    tracing::debug!("✅ Session cookie added for user: {}", user.id);

    Ok(())
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    JsonBody(payload): JsonBody<CredentialsRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt - Payload: {:?}", payload);
    let (username, password) = payload.into_parts();
    validate_username(&username)?;
    validate_password(&password)?;

    let user = auth_service::register_user(state.store.as_ref(), &username, password).await?;

    start_session(&state, &cookies, &user).await?;
    tracing::info!("✅ User registered: {}", user.id);

    let response = AuthResponse {
        username: user.username,
        user_id: user.id,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    JsonBody(payload): JsonBody<CredentialsRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt - Payload: {:?}", payload);
    let (username, password) = payload.into_parts();
    validate_login(&username, &password)?;

    let user = auth_service::authenticate_user(state.store.as_ref(), &username, password).await?;

    start_session(&state, &cookies, &user).await?;
    tracing::info!("✅ User logged in: {}", user.id);

    let response = AuthResponse {
        username: user.username,
        user_id: user.id,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout. Succeeds whether or not a session exists.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Result<Response> {
    if let Some(session_id) = extract_session_token(&cookies) {
        state.sessions.destroy(session_id).await?;
        tracing::info!("👋 Session destroyed: {}", session_id);
    }

    let mut session_cookie = Cookie::new(SESSION_COOKIE, "");
    session_cookie.set_max_age(Duration::seconds(0));
    session_cookie.set_path("/");
    cookies.remove(session_cookie);

    Ok((StatusCode::OK, Json(LogoutResponse { success: true })).into_response())
}

/// Reports whether the caller holds a session. Never fails: a session store
/// outage reads as "not authenticated".
#[axum::debug_handler]
pub async fn check_auth(State(state): State<AppState>, cookies: Cookies) -> Json<CheckAuthResponse> {
    let session = match current_session(&state, &cookies).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Session lookup failed during check-auth: {}", e);
            None
        }
    };

    Json(match session {
        Some(session) => CheckAuthResponse {
            authenticated: true,
            username: Some(session.username),
            user_id: Some(session.user_id),
        },
        None => CheckAuthResponse {
            authenticated: false,
            username: None,
            user_id: None,
        },
    })
}
