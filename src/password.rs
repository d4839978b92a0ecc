//! Password Hashing
//!
//! Argon2id hashing with a random salt per call. Hashes are stored in PHC
//! string format, so the salt and cost parameters travel with the hash and
//! verification does not depend on the current configuration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Longest password accepted for hashing, in bytes
pub const MAX_PASSWORD_LENGTH: usize = 4096;

/// Password hashing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("Cannot hash password: {0}")]
    Hashing(String),

    #[error("Cannot verify password: {0}")]
    Verification(String),
}

/// Argon2id hasher with fixed cost parameters
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Create a hasher with explicit cost parameters
    ///
    /// `memory_cost` is in KiB, `time_cost` is the iteration count.
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password, returning the PHC string
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::Hashing("password is empty".into()));
        }
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(PasswordError::Hashing(format!(
                "password exceeds {MAX_PASSWORD_LENGTH} bytes"
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC string
    ///
    /// A mismatch is `Ok(false)`. Only a hash that cannot be parsed or
    /// evaluated is an error.
    pub fn verify(&self, password: &str, hashed_password: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hashed_password)
            .map_err(|e| PasswordError::Verification(e.to_string()))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Verification(e.to_string())),
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}
