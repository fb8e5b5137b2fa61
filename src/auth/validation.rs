//! Registration Validation
//! Mission: Reject malformed identities before any hashing or storage work

use crate::auth::models::{RegisterRequest, UserRole};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_FULL_NAME_LEN: usize = 6;
pub const MAX_FULL_NAME_LEN: usize = 15;
pub const MIN_AGE: i64 = 17;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is a valid regex")
    })
}

/// First failed check, carrying the human-readable reason sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidEmail,
    PasswordTooShort,
    FullNameLength,
    TooYoung,
    MissingOccupation,
    UnknownRole,
}

impl ValidationError {
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::InvalidEmail => "Invalid or empty email",
            ValidationError::PasswordTooShort => {
                "Password must be at least 8 characters long and cannot be empty"
            }
            ValidationError::FullNameLength => {
                "Full name must be between 6 and 15 characters long and cannot be empty"
            }
            ValidationError::TooYoung => "Age must be at least 17 and cannot be empty",
            ValidationError::MissingOccupation => "Occupation cannot be empty",
            ValidationError::UnknownRole => "Role must be 'admin' or 'superadmin'",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl std::error::Error for ValidationError {}

pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email_regex().is_match(email)
}

/// Check a registration payload. Checks run in a fixed order and the first
/// failure wins. On success the parsed role is returned.
pub fn validate_registration(req: &RegisterRequest) -> Result<UserRole, ValidationError> {
    if !is_valid_email(&req.email) {
        return Err(ValidationError::InvalidEmail);
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    let name_len = req.full_name.chars().count();
    if !(MIN_FULL_NAME_LEN..=MAX_FULL_NAME_LEN).contains(&name_len) {
        return Err(ValidationError::FullNameLength);
    }
    if req.age < MIN_AGE {
        return Err(ValidationError::TooYoung);
    }
    if req.occupation.is_empty() {
        return Err(ValidationError::MissingOccupation);
    }
    UserRole::parse(&req.role).ok_or(ValidationError::UnknownRole)
}
