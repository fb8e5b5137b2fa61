//! Authentication API Endpoints
//! Mission: Registration, login and identity endpoints

use crate::api::{ApiError, ApiResponse};
use crate::auth::{
    jwt::JwtHandler,
    middleware::AuthUser,
    models::{LoginRequest, LoginResponse, RegisterRequest, User, UserResponse},
    password::{PasswordError, PasswordHasher},
    user_store::{CredentialStore, StoreError},
    validation::validate_registration,
};
use axum::{body::Bytes, extract::State, http::StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub user_store: Arc<dyn CredentialStore>,
    pub hasher: PasswordHasher,
    pub jwt_handler: Arc<JwtHandler>,
}

impl AuthState {
    pub fn new(
        user_store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        jwt_handler: Arc<JwtHandler>,
    ) -> Self {
        Self {
            user_store,
            hasher,
            jwt_handler,
        }
    }
}

/// Bodies are decoded regardless of `Content-Type`.
fn decode_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Error while parsing body: {}", e);
        ApiError::Validation("Error while parsing body".to_string())
    })
}

/// Register endpoint - POST /register
pub async fn register(
    State(state): State<AuthState>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let payload: RegisterRequest = decode_body(&body)?;

    let role = validate_registration(&payload).map_err(|e| {
        warn!(email = %payload.email, "Registration rejected: {}", e);
        ApiError::Validation(e.reason().to_string())
    })?;

    let password_hash = state
        .hasher
        .hash_async(payload.password)
        .await
        .map_err(|e| {
            error!("Error while hashing password: {}", e);
            ApiError::Internal("Error while hashing password".to_string())
        })?;

    // Advisory only: the store's uniqueness constraint decides races.
    let exists = state.user_store.exists(&payload.email).map_err(|e| {
        error!(email = %payload.email, "Error while checking user: {}", e);
        ApiError::Internal("Error while checking user".to_string())
    })?;
    if exists {
        warn!(email = %payload.email, "User already exists");
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let user = User {
        email: payload.email,
        password_hash,
        full_name: payload.full_name,
        age: payload.age,
        occupation: payload.occupation,
        role,
    };

    state.user_store.insert(&user).map_err(|e| match e {
        StoreError::DuplicateKey(_) => {
            warn!(email = %user.email, "User already exists (lost insert race)");
            ApiError::Conflict("User already exists".to_string())
        }
        other => {
            error!(email = %user.email, "Error while inserting user: {}", other);
            ApiError::Internal("Error while inserting user".to_string())
        }
    })?;

    info!(email = %user.email, role = %user.role, "User registered");

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "User created successfully",
    ))
}

/// Login endpoint - POST /login
pub async fn login(
    State(state): State<AuthState>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let payload: LoginRequest = decode_body(&body)?;

    info!(email = %payload.email, "Login attempt");

    let user = state
        .user_store
        .find_by_email(&payload.email)
        .map_err(|e| {
            error!(email = %payload.email, "Error while checking user: {}", e);
            ApiError::Internal("Error while checking user".to_string())
        })?
        .ok_or_else(|| {
            warn!(email = %payload.email, "User not found");
            ApiError::NotFound("User not found".to_string())
        })?;

    let matches = state
        .hasher
        .verify_async(user.password_hash.clone(), payload.password)
        .await
        .map_err(|e| {
            match &e {
                PasswordError::MalformedHash(_) => {
                    error!(email = %user.email, "Stored password hash is unusable: {}", e)
                }
                PasswordError::Hashing(_) | PasswordError::TooLong(_) => {
                    error!(email = %user.email, "Error while verifying password: {}", e)
                }
            }
            ApiError::Internal("Error while checking user".to_string())
        })?;

    if !matches {
        warn!(email = %user.email, "Passwords do not match");
        return Err(ApiError::Authentication(
            "Passwords do not match".to_string(),
        ));
    }

    let token = state.jwt_handler.generate_token(&user).map_err(|e| {
        error!(email = %user.email, "Error while generating token: {}", e);
        ApiError::Internal("Error while generating token".to_string())
    })?;

    info!(email = %user.email, role = %user.role, "Login successful");

    Ok(
        ApiResponse::success(StatusCode::CREATED, "User login successfully")
            .with_data(LoginResponse { token }),
    )
}

/// Current identity - GET /me
/// Built from the verified token; no store lookup.
pub async fn current_user(AuthUser(claims): AuthUser) -> ApiResponse {
    ApiResponse::success(StatusCode::OK, "User fetched successfully").with_data(claims)
}

/// List all users - GET /users
pub async fn list_users(State(state): State<AuthState>) -> Result<ApiResponse, ApiError> {
    let users = state.user_store.list_users().map_err(|e| {
        error!("Error while fetching users: {}", e);
        ApiError::Internal("Error while fetching users".to_string())
    })?;

    let response: Vec<UserResponse> = users.iter().map(UserResponse::from_user).collect();

    Ok(ApiResponse::success(StatusCode::OK, "Users fetched successfully").with_data(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{models::UserRole, user_store::UserStore};
    use axum::response::IntoResponse;

    fn test_state() -> AuthState {
        AuthState::new(
            Arc::new(UserStore::in_memory().unwrap()),
            PasswordHasher::new(4),
            Arc::new(JwtHandler::new("api-test-secret")),
        )
    }

    fn register_body(email: &str) -> Bytes {
        Bytes::from(
            serde_json::json!({
                "email": email,
                "password": "longpass1",
                "full_name": "John Smith",
                "age": 20,
                "occupation": "eng",
                "role": "admin",
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_plaintext() {
        let state = test_state();
        let response = register(State(state.clone()), register_body("a@b.com"))
            .await
            .unwrap();
        assert_eq!(response.code, 201);
        assert!(response.data.is_none());

        let stored = state.user_store.find_by_email("a@b.com").unwrap().unwrap();
        assert_ne!(stored.password_hash, "longpass1");
        assert!(state
            .hasher
            .verify(&stored.password_hash, "longpass1")
            .unwrap());
        assert_eq!(stored.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let state = test_state();
        register(State(state.clone()), register_body("a@b.com"))
            .await
            .unwrap();

        let err = register(State(state), register_body("a@b.com"))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Conflict("User already exists".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_bad_body_and_validation() {
        let state = test_state();

        let err = register(State(state.clone()), Bytes::from_static(b"{not json"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Validation("Error while parsing body".to_string())
        );

        let err = register(State(state.clone()), Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Validation("Invalid or empty email".to_string()));

        assert!(state.user_store.list_users().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_flow() {
        let state = test_state();
        register(State(state.clone()), register_body("a@b.com"))
            .await
            .unwrap();

        let ok = login(
            State(state.clone()),
            Bytes::from_static(br#"{"email":"a@b.com","password":"longpass1"}"#),
        )
        .await
        .unwrap();
        assert_eq!(ok.code, 201);
        let token = ok.data.unwrap()["token"].as_str().unwrap().to_string();
        let claims = state.jwt_handler.validate_token(&token).unwrap();
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.full_name, "John Smith");
        assert_eq!(claims.role, UserRole::Admin);

        let wrong = login(
            State(state.clone()),
            Bytes::from_static(br#"{"email":"a@b.com","password":"longpass2"}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(
            wrong,
            ApiError::Authentication("Passwords do not match".to_string())
        );

        let missing = login(
            State(state),
            Bytes::from_static(br#"{"email":"x@b.com","password":"longpass1"}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(missing, ApiError::NotFound("User not found".to_string()));
    }

    #[tokio::test]
    async fn test_register_password_past_bcrypt_limit_is_internal() {
        let state = test_state();
        let body = serde_json::json!({
            "email": "a@b.com",
            "password": format!("{}correct-suffix", "a".repeat(72)),
            "full_name": "John Smith",
            "age": 20,
            "occupation": "eng",
            "role": "admin",
        });

        let err = register(State(state.clone()), Bytes::from(body.to_string()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Internal("Error while hashing password".to_string())
        );
        assert!(!state.user_store.exists("a@b.com").unwrap());
    }

    #[tokio::test]
    async fn test_login_with_corrupt_hash_is_internal() {
        let state = test_state();
        state
            .user_store
            .insert(&User {
                email: "a@b.com".to_string(),
                password_hash: "plaintext-by-mistake".to_string(),
                full_name: "John Smith".to_string(),
                age: 20,
                occupation: "eng".to_string(),
                role: UserRole::Admin,
            })
            .unwrap();

        let err = login(
            State(state),
            Bytes::from_static(br#"{"email":"a@b.com","password":"plaintext-by-mistake"}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
