use crate::error::TokenError;
use crate::jwt::ClaimsCodec;
use crate::refresh::generator::RefreshTokenGenerator;
use crate::refresh::hasher::RefreshHasher;
use crate::refresh::record::RefreshRecord;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Output of a single issuance. `refresh_token` is the only copy of the
/// plaintext secret; the caller delivers it once and persists `record`.
#[derive(Debug, Clone)]
pub struct IssuedPair {
    /// Signed access token
    pub access_token: String,
    /// Opaque refresh secret
    pub refresh_token: String,
    /// Hashed record to hand to the refresh store
    pub record: RefreshRecord,
}

/// Builds access/refresh pairs.
#[derive(Debug, Clone)]
pub struct TokenPairIssuer {
    codec: Arc<ClaimsCodec>,
    hasher: RefreshHasher,
    access_ttl: Duration,
}

impl TokenPairIssuer {
    /// Create an issuer.
    #[must_use]
    pub fn new(codec: Arc<ClaimsCodec>, hasher: RefreshHasher, access_ttl: Duration) -> Self {
        Self {
            codec,
            hasher,
            access_ttl,
        }
    }

    /// Issue a pair now.
    ///
    /// # Errors
    ///
    /// `Entropy` or `Signing`; both are fatal at this layer.
    pub async fn issue(&self, subject_id: &str, bound_address: &str) -> Result<IssuedPair, TokenError> {
        self.issue_at(subject_id, bound_address, Utc::now()).await
    }

    /// Issue a pair as of `now`.
    ///
    /// # Errors
    ///
    /// `Entropy` or `Signing`; both are fatal at this layer.
    pub async fn issue_at(
        &self,
        subject_id: &str,
        bound_address: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedPair, TokenError> {
        let correlation_id = RefreshTokenGenerator::generate_correlation_id()?;
        let access_token =
            self.codec
                .encode_at(&correlation_id, subject_id, bound_address, self.access_ttl, now)?;

        let refresh_token = RefreshTokenGenerator::generate_secret()?;
        let hashed_value = self.hasher.hash_blocking(refresh_token.clone()).await?;

        debug!(
            correlation_id = %correlation_id,
            subject_id = %subject_id,
            "Issued token pair"
        );

        Ok(IssuedPair {
            access_token,
            refresh_token,
            record: RefreshRecord::new(correlation_id, subject_id.to_string(), hashed_value, now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashCost;
    use crate::jwt::SigningSecret;
    use crate::refresh::record::RefreshState;

    fn issuer() -> TokenPairIssuer {
        let secret = SigningSecret::new(b"test-secret-key-for-testing-only-32bytes".to_vec()).unwrap();
        let hasher = RefreshHasher::new(HashCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        TokenPairIssuer::new(
            Arc::new(ClaimsCodec::new(&secret)),
            hasher,
            Duration::from_secs(1800),
        )
    }

    #[tokio::test]
    async fn test_issue_links_access_and_record() {
        let issuer = issuer();
        let pair = issuer.issue("u1", "1.2.3.4").await.unwrap();

        let claims = issuer.codec.decode(&pair.access_token).unwrap();
        assert_eq!(claims.correlation_id, pair.record.correlation_id);
        assert_eq!(claims.subject_id, "u1");
        assert_eq!(claims.bound_address, "1.2.3.4");
        assert_eq!(claims.exp - claims.iat, 1800);

        assert_eq!(pair.record.subject_id, "u1");
        assert_eq!(pair.record.state, RefreshState::Active);
        assert_ne!(pair.record.hashed_value, pair.refresh_token);
        assert!(issuer.hasher.verify(&pair.refresh_token, &pair.record.hashed_value));
    }

    #[tokio::test]
    async fn test_refresh_secret_independent_of_access_token() {
        let pair = issuer().issue("u1", "1.2.3.4").await.unwrap();
        assert!(!pair.access_token.contains(&pair.refresh_token));
        assert!(!pair.refresh_token.contains('.'));
    }

    #[tokio::test]
    async fn test_each_issue_is_fresh() {
        let issuer = issuer();
        let a = issuer.issue("u1", "1.2.3.4").await.unwrap();
        let b = issuer.issue("u1", "1.2.3.4").await.unwrap();
        assert_ne!(a.record.correlation_id, b.record.correlation_id);
        assert_ne!(a.refresh_token, b.refresh_token);
    }
}
