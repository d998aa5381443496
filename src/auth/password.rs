/// Password Hashing and Verification
///
/// bcrypt digests with a configurable work factor. The async variants run
/// the hash on tokio's blocking pool so request workers are not stalled.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
/// bcrypt only reads the first 72 bytes of its input
const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password using bcrypt
    ///
    /// # Errors
    /// Returns error if bcrypt hashing fails (invalid cost, resource exhaustion)
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its digest
    ///
    /// A wrong password is `Ok(false)`. A digest that cannot be parsed is an
    /// error, never a silent mismatch.
    pub fn verify(&self, password: &str, digest: &str) -> Result<bool, AppError> {
        verify(password, digest)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }

    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    pub async fn verify_blocking(&self, password: String, digest: String) -> Result<bool, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest)).await?
    }
}

/// Signup password policy: at least 8 characters, at most 72 bytes.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password".to_string(), MIN_PASSWORD_LENGTH));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_BYTES));
    }

    Ok(())
}
