//! Router assembly
//!
//! Wires the auth endpoints and the role-gated routes together. Route
//! policies are fixed here, when the router is built.

use crate::api::health_check;
use crate::auth::{
    api as auth_api, role_gate, AuthState, CredentialStore, JwtHandler, PasswordHasher,
    RoleGate, UserStore,
};
use crate::config::AppConfig;
use crate::middleware::request_logging;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Long-lived application components, built once at startup.
#[derive(Clone)]
pub struct App {
    pub auth_state: AuthState,
    /// Guards ordinary protected routes (`NON_REQUIRED_ROLES`)
    pub member_gate: RoleGate,
    /// Guards privileged routes (`REQUIRED_ROLES`)
    pub privileged_gate: RoleGate,
}

impl App {
    pub fn new(config: &AppConfig, user_store: Arc<dyn CredentialStore>) -> Self {
        let jwt_handler = Arc::new(JwtHandler::with_ttl(
            &config.access_secret,
            chrono::Duration::seconds(config.token_ttl_secs),
        ));
        let hasher = PasswordHasher::new(config.bcrypt_cost);

        Self {
            auth_state: AuthState::new(user_store, hasher, jwt_handler.clone()),
            member_gate: RoleGate::new(jwt_handler.clone(), config.non_required_policy),
            privileged_gate: RoleGate::new(jwt_handler, config.required_policy),
        }
    }

    /// Open the SQLite store named in the config.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let user_store = UserStore::new(&config.db_path)?;
        Ok(Self::new(config, Arc::new(user_store)))
    }

    pub fn router(&self) -> Router {
        let auth_router = Router::new()
            .route("/register", post(auth_api::register))
            .route("/login", post(auth_api::login))
            .with_state(self.auth_state.clone());

        let member_routes = Router::new()
            .route("/me", get(auth_api::current_user))
            .route_layer(middleware::from_fn_with_state(
                self.member_gate.clone(),
                role_gate,
            ));

        let privileged_routes = Router::new()
            .route("/users", get(auth_api::list_users))
            .route_layer(middleware::from_fn_with_state(
                self.privileged_gate.clone(),
                role_gate,
            ))
            .with_state(self.auth_state.clone());

        let public_routes = Router::new().route("/health", get(health_check));

        Router::new()
            .merge(public_routes)
            .merge(auth_router)
            .merge(member_routes)
            .merge(privileged_routes)
            .layer(middleware::from_fn(request_logging))
            .layer(CorsLayer::permissive())
    }
}
