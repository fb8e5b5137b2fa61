//! Authentication Middleware
//! Mission: Gate protected routes on a valid token and a route role policy

use crate::api::ApiResponse;
use crate::auth::{
    jwt::JwtHandler,
    models::{Claims, UserRole},
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Role requirement attached to a group of routes when the router is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolePolicy {
    /// Any authenticated identity
    Any,
    /// Claims role must equal this role exactly
    Require(UserRole),
}

impl RolePolicy {
    /// Empty string means `Any`; otherwise the string must name a role.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() {
            return Some(RolePolicy::Any);
        }
        UserRole::parse(s).map(RolePolicy::Require)
    }

    pub fn permits(&self, role: UserRole) -> bool {
        match self {
            RolePolicy::Any => true,
            RolePolicy::Require(required) => *required == role,
        }
    }
}

/// Why a request was turned away by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    MissingHeader,
    InvalidToken,
    UnauthorizedRole,
}

impl GateRejection {
    /// Internal reason, used in logs only.
    pub fn reason(&self) -> &'static str {
        match self {
            GateRejection::MissingHeader => "missing header",
            GateRejection::InvalidToken => "invalid token",
            GateRejection::UnauthorizedRole => "unauthorized role",
        }
    }

    /// Client-facing message. A role mismatch is indistinguishable from a bad
    /// token on the wire.
    pub fn message(&self) -> &'static str {
        match self {
            GateRejection::MissingHeader => "Missing Authorization header",
            GateRejection::InvalidToken | GateRejection::UnauthorizedRole => {
                "Invalid Authorization header"
            }
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        ApiResponse::failed(StatusCode::UNAUTHORIZED, self.message()).into_response()
    }
}

/// Token verifier plus the policy of the routes it guards.
#[derive(Clone)]
pub struct RoleGate {
    jwt_handler: Arc<JwtHandler>,
    policy: RolePolicy,
}

impl RoleGate {
    pub fn new(jwt_handler: Arc<JwtHandler>, policy: RolePolicy) -> Self {
        Self {
            jwt_handler,
            policy,
        }
    }

    pub fn policy(&self) -> RolePolicy {
        self.policy
    }

    /// Decide on a raw `Authorization` header value.
    ///
    /// The value is the token itself; no `Bearer ` scheme is stripped.
    pub fn authorize(&self, authorization: Option<&str>) -> Result<Claims, GateRejection> {
        let token = match authorization {
            Some(value) if !value.is_empty() => value,
            _ => return Err(GateRejection::MissingHeader),
        };

        let claims = self.jwt_handler.validate_token(token).map_err(|e| {
            debug!("Token rejected: {}", e);
            GateRejection::InvalidToken
        })?;

        if !self.policy.permits(claims.role) {
            return Err(GateRejection::UnauthorizedRole);
        }

        Ok(claims)
    }
}

/// Role gate middleware. Use with `middleware::from_fn_with_state(gate, role_gate)`.
pub async fn role_gate(
    State(gate): State<RoleGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    let outcome = match req.headers().get(header::AUTHORIZATION) {
        None => gate.authorize(None),
        Some(value) => match value.to_str() {
            Ok(s) => gate.authorize(Some(s)),
            // Non-visible-ASCII bytes can never form a JWT.
            Err(_) => Err(GateRejection::InvalidToken),
        },
    };

    let claims = outcome.map_err(|rejection| {
        warn!(
            method = %req.method(),
            path = %req.uri().path(),
            reason = rejection.reason(),
            "Request rejected by role gate"
        );
        rejection
    })?;

    // Add claims to request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor for the claims attached by [`role_gate`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or(GateRejection::MissingHeader)
    }
}
