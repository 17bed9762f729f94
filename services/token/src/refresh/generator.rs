use crate::error::TokenError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;

/// Bytes of entropy in a correlation id.
pub const CORRELATION_ID_BYTES: usize = 16;
/// Bytes of entropy in a refresh secret.
pub const REFRESH_SECRET_BYTES: usize = 32;

/// Draws identifiers and secrets straight from the OS entropy source.
pub struct RefreshTokenGenerator;

impl RefreshTokenGenerator {
    /// Fill `N` bytes from the OS RNG.
    ///
    /// # Errors
    ///
    /// Returns `Entropy` if the OS source fails.
    pub fn random_bytes<const N: usize>() -> Result<[u8; N], TokenError> {
        let mut bytes = [0u8; N];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TokenError::entropy(e.to_string()))?;
        Ok(bytes)
    }

    /// Opaque refresh secret, 256 bits, URL-safe base64.
    ///
    /// # Errors
    ///
    /// Returns `Entropy` if the OS source fails.
    pub fn generate_secret() -> Result<String, TokenError> {
        let bytes = Self::random_bytes::<REFRESH_SECRET_BYTES>()?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Pair correlation id, 128 bits, URL-safe base64.
    ///
    /// # Errors
    ///
    /// Returns `Entropy` if the OS source fails.
    pub fn generate_correlation_id() -> Result<String, TokenError> {
        let bytes = Self::random_bytes::<CORRELATION_ID_BYTES>()?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}
