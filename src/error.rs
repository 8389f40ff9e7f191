use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Bad registration or login input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The username is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad credentials or missing handshake data.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A request that needs a session (or a realtime handshake) arrived without one.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Message safe to hand back to a client. Infrastructure details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Pool(_) => "Database error".to_string(),
            AppError::Redis(_) => "Session store error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::Validation(msg) | AppError::Conflict(msg) | AppError::Authentication(msg) => {
                msg.clone()
            }
            AppError::NotAuthenticated => "Not authenticated".to_string(),
        }
    }

    /// Whether this error comes from the persistence or session layer.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Pool(_) | AppError::Redis(_) | AppError::Internal(_)
        )
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {}", rejection.body_text());
        AppError::Validation("Invalid request body".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }

            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                StatusCode::BAD_REQUEST
            }

            AppError::Conflict(ref msg) => {
                tracing::debug!("Conflict: {}", msg);
                StatusCode::BAD_REQUEST
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                StatusCode::UNAUTHORIZED
            }

            AppError::NotAuthenticated => {
                tracing::debug!("Request without session");
                StatusCode::UNAUTHORIZED
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": self.public_message()
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
