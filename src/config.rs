//! Server configuration
//!
//! Read once at startup from CLI flags or the environment (after `.env` is
//! loaded), validated, and then passed by value into the components that
//! need it. Nothing reads the environment after startup.

use crate::auth::{
    jwt::DEFAULT_TOKEN_TTL_SECS,
    password::{DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST},
    RolePolicy,
};
use clap::Parser;
use std::fmt;

/// Raw settings as given on the command line / environment
#[derive(Parser, Debug, Clone)]
#[command(name = "recipe-auth-api")]
#[command(about = "Recipe API server with registration, login and role-gated routes")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "localhost:8080")]
    pub bind_addr: String,

    /// SQLite database holding the users table
    #[arg(long, env = "AUTH_DB_PATH", default_value = "recipe_auth.db")]
    pub db_path: String,

    /// HMAC secret used to sign and verify access tokens
    #[arg(long, env = "ACCESS_SECRET", hide_env_values = true)]
    pub access_secret: Option<String>,

    /// Role policy for privileged routes ("" = any authenticated user)
    #[arg(long, env = "REQUIRED_ROLES", default_value = "superadmin")]
    pub required_roles: String,

    /// Role policy for ordinary protected routes ("" = any authenticated user)
    #[arg(long, env = "NON_REQUIRED_ROLES", default_value = "")]
    pub non_required_roles: String,

    /// bcrypt cost factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = DEFAULT_HASH_COST)]
    pub bcrypt_cost: u32,

    /// Access token lifetime in seconds
    #[arg(long, env = "TOKEN_TTL_SECS", default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub token_ttl_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingSecret,
    InvalidPolicy { name: &'static str, value: String },
    InvalidCost(u32),
    InvalidTtl(i64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSecret => write!(f, "ACCESS_SECRET must be set and non-empty"),
            Self::InvalidPolicy { name, value } => write!(
                f,
                "{} must be empty, 'admin' or 'superadmin' (got {:?})",
                name, value
            ),
            Self::InvalidCost(cost) => write!(f, "BCRYPT_COST must be in 4..=31 (got {})", cost),
            Self::InvalidTtl(ttl) => write!(f, "TOKEN_TTL_SECS must be positive (got {})", ttl),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validated process-wide configuration
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: String,
    pub access_secret: String,
    pub required_policy: RolePolicy,
    pub non_required_policy: RolePolicy,
    pub bcrypt_cost: u32,
    pub token_ttl_secs: i64,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("access_secret", &"<redacted>")
            .field("required_policy", &self.required_policy)
            .field("non_required_policy", &self.non_required_policy)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

fn parse_policy(name: &'static str, value: &str) -> Result<RolePolicy, ConfigError> {
    RolePolicy::parse(value.trim()).ok_or_else(|| ConfigError::InvalidPolicy {
        name,
        value: value.to_string(),
    })
}

impl TryFrom<ServerArgs> for AppConfig {
    type Error = ConfigError;

    fn try_from(args: ServerArgs) -> Result<Self, Self::Error> {
        let access_secret = args
            .access_secret
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&args.bcrypt_cost) {
            return Err(ConfigError::InvalidCost(args.bcrypt_cost));
        }
        if args.token_ttl_secs <= 0 {
            return Err(ConfigError::InvalidTtl(args.token_ttl_secs));
        }

        Ok(Self {
            bind_addr: args.bind_addr,
            db_path: args.db_path,
            access_secret,
            required_policy: parse_policy("REQUIRED_ROLES", &args.required_roles)?,
            non_required_policy: parse_policy("NON_REQUIRED_ROLES", &args.non_required_roles)?,
            bcrypt_cost: args.bcrypt_cost,
            token_ttl_secs: args.token_ttl_secs,
        })
    }
}
