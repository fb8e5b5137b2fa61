//! JWT Token Handler
//! Mission: Issue and validate HS256 access tokens

use crate::auth::models::{Claims, User};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use tracing::debug;

/// Default access token lifetime
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug)]
pub enum TokenError {
    /// Signing failed; never caused by the identity itself.
    Signing(String),
    /// Bad shape, bad signature, wrong algorithm or expired.
    Invalid(jsonwebtoken::errors::Error),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Signing(e) => write!(f, "Failed to sign token: {}", e),
            TokenError::Invalid(e) => write!(f, "Invalid or expired token: {}", e),
        }
    }
}

impl std::error::Error for TokenError {}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key and the default lifetime
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token past `exp` is rejected immediately.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate a JWT token for a verified user
    pub fn generate_token(&self, user: &User) -> Result<String, TokenError> {
        let expiration = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("Invalid timestamp".to_string()))?
            .timestamp();

        let claims = Claims {
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            exp: expiration.max(0) as usize,
        };

        debug!(
            email = %user.email,
            role = %user.role,
            "Generating JWT, expires in {}s",
            self.ttl.num_seconds()
        );

        self.sign(&claims)
    }

    /// Sign an arbitrary claims payload
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate a JWT token and extract claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(TokenError::Invalid)?;

        debug!(email = %decoded.claims.email, "Validated JWT");

        Ok(decoded.claims)
    }
}
