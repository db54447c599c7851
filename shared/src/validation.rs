//! Input validation functions
//!
//! Request-body level checks only. Anything security sensitive (password
//! verification, token checks) lives in the backend auth module.

/// Validate a login identifier (handle or email)
pub fn validate_identifier(identifier: &str) -> Result<(), String> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }
    if trimmed.len() > 255 {
        return Err("Identifier too long".to_string());
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password.len() > 128 {
        return Err("Password too long".to_string());
    }
    Ok(())
}
