use crate::error::{AppError, Result};

pub const MESSAGE_MAX_CHARS: usize = 2000;

/// Trims a chat message and checks it is neither blank nor oversized.
pub fn validate_message(text: &str) -> Result<&str> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }

    if trimmed.chars().count() > MESSAGE_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Message must be at most {} characters",
            MESSAGE_MAX_CHARS
        )));
    }

    Ok(trimmed)
}
