//! One-way hashing of refresh secrets.
//!
//! Argon2id in PHC string format, salt drawn per record from the OS
//! entropy source. The whole secret is hashed; there is no prefix cut.

use crate::config::HashCost;
use crate::error::TokenError;
use crate::refresh::generator::RefreshTokenGenerator;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

const SALT_BYTES: usize = 16;

/// Hashes and verifies refresh secrets.
#[derive(Clone)]
pub struct RefreshHasher {
    argon: Argon2<'static>,
}

impl RefreshHasher {
    /// Build a hasher with the given cost.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the parameters are outside Argon2's limits.
    pub fn new(cost: HashCost) -> Result<Self, TokenError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| TokenError::config(format!("Invalid argon2 parameters: {e}")))?;
        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash `secret` under a fresh salt. CPU-bound; call from a blocking
    /// context.
    ///
    /// # Errors
    ///
    /// `Entropy` if no salt can be drawn, `Internal` if hashing fails.
    pub fn hash(&self, secret: &str) -> Result<String, TokenError> {
        let salt_bytes = RefreshTokenGenerator::random_bytes::<SALT_BYTES>()?;
        let salt = SaltString::encode_b64(&salt_bytes)?;
        let hash = self.argon.hash_password(secret.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Check `secret` against a stored PHC hash. A hash that cannot be
    /// parsed never matches.
    #[must_use]
    pub fn verify(&self, secret: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// [`Self::hash`] on the blocking pool.
    ///
    /// # Errors
    ///
    /// As [`Self::hash`], or `Internal` if the blocking task panics.
    pub async fn hash_blocking(&self, secret: String) -> Result<String, TokenError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| TokenError::internal(format!("hash task failed: {e}")))?
    }

    /// [`Self::verify`] on the blocking pool.
    ///
    /// # Errors
    ///
    /// `Internal` if the blocking task panics.
    pub async fn verify_blocking(&self, secret: String, stored: String) -> Result<bool, TokenError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &stored))
            .await
            .map_err(|e| TokenError::internal(format!("verify task failed: {e}")))
    }
}

impl std::fmt::Debug for RefreshHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshHasher").finish_non_exhaustive()
    }
}
