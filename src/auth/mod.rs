//! Authentication Module
//! Mission: Credential storage, password hashing, JWT issuance and role gating

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod user_store;
pub mod validation;

pub use api::AuthState;
pub use jwt::JwtHandler;
pub use middleware::{role_gate, AuthUser, GateRejection, RoleGate, RolePolicy};
pub use password::PasswordHasher;
pub use user_store::{CredentialStore, UserStore};
