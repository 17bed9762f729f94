//! Process-wide HMAC signing secret.

use crate::error::TokenError;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric secret shared by encoder and decoder. Read-only after
/// construction and wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap raw secret bytes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the secret is empty.
    pub fn new(bytes: Vec<u8>) -> Result<Self, TokenError> {
        if bytes.is_empty() {
            return Err(TokenError::config("signing secret must not be empty"));
        }
        Ok(Self(bytes))
    }

    /// Secret length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; empty secrets are rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret([REDACTED; {}])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_secret_rejected() {
        assert!(SigningSecret::new(Vec::new()).is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let secret = SigningSecret::new(b"super-secret-value".to_vec()).unwrap();
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("super"));
        assert!(rendered.contains("REDACTED"));
        assert_eq!(secret.len(), 18);
    }
}
