//! Authentication Models
//! Mission: Define identity, credential and token data structures

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Stored user identity. `email` is the natural key.
#[derive(Debug, Clone)]
pub struct User {
    pub email: String,
    pub password_hash: String, // bcrypt hash - never serialize
    pub full_name: String,
    pub age: i64,
    pub occupation: String,
    pub role: UserRole,
}

/// User roles for route gating
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "superadmin")]
    SuperAdmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "superadmin",
        }
    }

    /// Exact, case-sensitive match on the wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UserRole::Admin),
            "superadmin" => Some(UserRole::SuperAdmin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub exp: usize, // expiration timestamp
}

/// Registration request body.
///
/// Missing or `null` fields decode to their zero value so that validation,
/// not the JSON decoder, reports what is wrong with the payload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub password: String,
    #[serde(deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub age: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub occupation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub role: String,
}

/// Login request body
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub password: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Login response payload
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// User response (sanitized)
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub email: String,
    pub full_name: String,
    pub age: i64,
    pub occupation: String,
    pub role: UserRole,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            age: user.age,
            occupation: user.occupation.clone(),
            role: user.role,
        }
    }
}
