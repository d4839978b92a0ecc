//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use crate::token::{TokenKind, MIN_SECRET_KEY_LENGTH};
use std::env;
use std::str::FromStr;

/// Longest accepted token lifetime in seconds (ten years)
pub const MAX_TOKEN_DURATION: i64 = 10 * 365 * 24 * 60 * 60;

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Symmetric key for token sealing/signing (from TOKEN_SYMMETRIC_KEY env var)
    pub token_symmetric_key: String,

    /// Token scheme (from TOKEN_KIND env var: "paseto" or "jwt")
    pub token_kind: TokenKind,

    /// Access token lifetime in seconds (from ACCESS_TOKEN_DURATION env var)
    pub access_token_duration: i64,

    /// Refresh token and session lifetime in seconds (from REFRESH_TOKEN_DURATION env var)
    pub refresh_token_duration: i64,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,
}

impl AuthConfig {
    /// Load configuration from environment variables
    ///
    /// Fails if TOKEN_SYMMETRIC_KEY is unset or a variable does not parse.
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            token_symmetric_key: env::var("TOKEN_SYMMETRIC_KEY").map_err(|_| {
                AuthError::Config("TOKEN_SYMMETRIC_KEY environment variable must be set".into())
            })?,

            token_kind: parse_var("TOKEN_KIND", TokenKind::Paseto)?,

            access_token_duration: parse_var("ACCESS_TOKEN_DURATION", 900)?, // 15 minutes

            refresh_token_duration: parse_var("REFRESH_TOKEN_DURATION", 1_296_000)?, // 360 hours

            argon2_memory_cost: parse_var("ARGON2_MEMORY_COST", 19_456)?, // 19 MiB

            argon2_time_cost: parse_var("ARGON2_TIME_COST", 2)?,

            argon2_parallelism: parse_var("ARGON2_PARALLELISM", 1)?,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.token_symmetric_key.len() < MIN_SECRET_KEY_LENGTH {
            return Err(AuthError::Config(format!(
                "TOKEN_SYMMETRIC_KEY must be at least {MIN_SECRET_KEY_LENGTH} characters"
            )));
        }

        if self.access_token_duration <= 0 {
            return Err(AuthError::Config(
                "ACCESS_TOKEN_DURATION must be positive".to_string(),
            ));
        }

        if self.refresh_token_duration > MAX_TOKEN_DURATION {
            return Err(AuthError::Config(format!(
                "REFRESH_TOKEN_DURATION must not exceed {MAX_TOKEN_DURATION} seconds"
            )));
        }

        if self.refresh_token_duration <= self.access_token_duration {
            return Err(AuthError::Config(
                "REFRESH_TOKEN_DURATION must be greater than ACCESS_TOKEN_DURATION".to_string(),
            ));
        }

        Ok(())
    }

    pub fn access_duration(&self) -> Result<chrono::Duration, AuthError> {
        to_duration("ACCESS_TOKEN_DURATION", self.access_token_duration)
    }

    pub fn refresh_duration(&self) -> Result<chrono::Duration, AuthError> {
        to_duration("REFRESH_TOKEN_DURATION", self.refresh_token_duration)
    }
}

fn to_duration(name: &str, seconds: i64) -> Result<chrono::Duration, AuthError> {
    chrono::Duration::try_seconds(seconds)
        .ok_or_else(|| AuthError::Config(format!("{name} is out of range")))
}

fn parse_var<T>(name: &str, default: T) -> Result<T, AuthError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| AuthError::Config(format!("{name} is invalid: {e}"))),
        Err(_) => Ok(default),
    }
}
