use crate::error::{AppError, Result};

/// Usernames are stored in a `VARCHAR(50)` column.
pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 6;
pub const PASSWORD_MAX_CHARS: usize = 128;

/// Validates a username.
///
/// # Arguments
///
/// * `username` - The username to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the username is valid.
pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();

    if len < USERNAME_MIN_CHARS {
        return Err(AppError::Validation(format!(
            "Username must be at least {} characters long",
            USERNAME_MIN_CHARS
        )));
    }

    if len > USERNAME_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters",
            USERNAME_MAX_CHARS
        )));
    }

    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }

    Ok(())
}

/// Validates a password.
///
/// # Arguments
///
/// * `password` - The password to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the password is valid.
pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();

    if len < PASSWORD_MIN_CHARS {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_CHARS
        )));
    }

    if len > PASSWORD_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Password must be at most {} characters",
            PASSWORD_MAX_CHARS
        )));
    }

    Ok(())
}

/// Login only checks presence; anything else would hint at which accounts exist.
pub fn validate_login(username: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    Ok(())
}
