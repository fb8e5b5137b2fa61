//! Password Hashing
//! Mission: One-way salted hashing with constant-time verification (bcrypt)

use bcrypt::BcryptError;
use std::fmt;

/// bcrypt cost used when none is configured
pub const DEFAULT_HASH_COST: u32 = 10;
pub const MIN_HASH_COST: u32 = 4;
pub const MAX_HASH_COST: u32 = 31;
/// bcrypt reads at most this many bytes of input
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug)]
pub enum PasswordError {
    /// Salt generation or digest computation failed.
    Hashing(String),
    /// Stored hash is not a bcrypt hash.
    MalformedHash(String),
    /// Plaintext exceeds what bcrypt can digest without truncation.
    TooLong(usize),
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::Hashing(e) => write!(f, "Password hashing failed: {}", e),
            PasswordError::MalformedHash(e) => write!(f, "Malformed password hash: {}", e),
            PasswordError::TooLong(len) => write!(
                f,
                "Password is {} bytes, bcrypt accepts at most {}",
                len, MAX_PASSWORD_BYTES
            ),
        }
    }
}

impl std::error::Error for PasswordError {}

/// bcrypt hasher with a fixed cost. Cheap to clone.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// Inputs over `MAX_PASSWORD_BYTES` are refused rather than truncated.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong(plaintext.len()));
        }
        bcrypt::hash(plaintext, self.cost).map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; only an unparseable hash is an error.
    /// No stored hash came from an over-long plaintext, so those never match.
    pub fn verify(&self, hash: &str, plaintext: &str) -> Result<bool, PasswordError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        bcrypt::verify(plaintext, hash).map_err(|e| match e {
            BcryptError::InvalidHash(_)
            | BcryptError::InvalidPrefix(_)
            | BcryptError::InvalidBase64(_)
            | BcryptError::InvalidSaltLen(_)
            | BcryptError::InvalidCost(_)
            | BcryptError::CostNotAllowed(_) => PasswordError::MalformedHash(e.to_string()),
            other => PasswordError::Hashing(other.to_string()),
        })
    }

    /// `hash` on the blocking pool; bcrypt would otherwise stall the reactor.
    pub async fn hash_async(&self, plaintext: String) -> Result<String, PasswordError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
    }

    /// `verify` on the blocking pool.
    pub async fn verify_async(
        &self,
        hash: String,
        plaintext: String,
    ) -> Result<bool, PasswordError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &plaintext))
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
    }
}
