use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AppError, Result};

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.]{3,32}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Normalizes and checks the credential fields shared by registration and
/// the admin bootstrap. Returns the trimmed username and lowercased email.
pub fn credentials(username: &str, email: &str, password: &str) -> Result<(String, String)> {
    let username = username.trim().to_string();
    let email = email.trim().to_lowercase();

    if !is_valid_username(&username) {
        return Err(AppError::validation(
            "Username must be 3-32 characters of letters, digits, '_' or '.'",
        ));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("Password too short"));
    }
    Ok((username, email))
}

pub fn required(field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::validation(format!("{field} is required"))),
    }
}
