//! Issuance and single-use rotation of token pairs.
//!
//! A rotation is terminal in one call: decode the access token, compare the
//! bound address, consume the paired refresh record, reissue bound to the
//! current address, persist the new record. Every rejection is final; the
//! client decides whether to retry.

use crate::error::{RejectReason, TokenError};
use crate::jwt::{AccessClaims, ClaimsCodec};
use crate::metrics;
use crate::refresh::TokenPairIssuer;
use crate::session::notifier::{AddressAnomaly, AnomalyNotifier};
use crate::session::pair::{RotationRequest, TokenPair};
use crate::storage::RefreshStore;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(2);

/// Orchestrates issuance and rotation over the codec, issuer and store.
pub struct SessionRotator {
    codec: Arc<ClaimsCodec>,
    issuer: TokenPairIssuer,
    store: Arc<dyn RefreshStore>,
    notifier: Arc<dyn AnomalyNotifier>,
    storage_timeout: Duration,
    notification_timeout: Duration,
}

impl SessionRotator {
    /// Create a rotator with default deadlines.
    pub fn new(
        codec: Arc<ClaimsCodec>,
        issuer: TokenPairIssuer,
        store: Arc<dyn RefreshStore>,
        notifier: Arc<dyn AnomalyNotifier>,
    ) -> Self {
        Self {
            codec,
            issuer,
            store,
            notifier,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            notification_timeout: DEFAULT_NOTIFICATION_TIMEOUT,
        }
    }

    /// Deadline applied to each storage call.
    #[must_use]
    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    /// Deadline applied to each anomaly notification.
    #[must_use]
    pub fn with_notification_timeout(mut self, timeout: Duration) -> Self {
        self.notification_timeout = timeout;
        self
    }

    /// Issue a fresh pair for `subject_id` bound to `address` and persist
    /// its refresh record.
    ///
    /// # Errors
    ///
    /// `Entropy`, `Signing`, `Conflict` or `Storage`.
    #[instrument(skip(self))]
    pub async fn issue(&self, subject_id: &str, address: &str) -> Result<TokenPair, TokenError> {
        let issued = self.issuer.issue(subject_id, address).await?;
        self.storage_call("persist", self.store.persist(&issued.record))
            .await?;

        if let Err(e) = self
            .storage_call("record_principal", self.store.record_principal(subject_id, address))
            .await
        {
            warn!(error = %e, "Failed to record principal sign-in");
        }

        metrics::record_pair_issued();
        info!(correlation_id = %issued.record.correlation_id, "Issued token pair");

        Ok(TokenPair {
            access: issued.access_token,
            refresh: issued.refresh_token,
        })
    }

    /// Exchange a valid access/refresh pair for a new one bound to
    /// `current_address`. The presented refresh secret is consumed.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for any credential failure, `Storage` if the store is
    /// unavailable, `Entropy`/`Signing`/`Conflict` on reissue failure.
    #[instrument(skip(self, request))]
    pub async fn rotate(
        &self,
        request: &RotationRequest,
        current_address: &str,
    ) -> Result<TokenPair, TokenError> {
        let claims = match self.codec.decode(&request.access) {
            Ok(claims) => claims,
            Err(e) => return Err(self.reject(e.into_unauthorized())),
        };

        if claims.address_differs(current_address) {
            self.signal_anomaly(&claims, current_address).await;
        }

        let matched = self
            .storage_call(
                "verify_and_consume",
                self.store
                    .verify_and_consume(&claims.correlation_id, &request.refresh),
            )
            .await
            .map_err(|e| self.reject(e))?;

        if !matched {
            warn!(
                subject_id = %claims.subject_id,
                correlation_id = %claims.correlation_id,
                "Refresh secret rejected"
            );
            return Err(self.reject(TokenError::Unauthorized(RejectReason::RefreshMismatch)));
        }

        let issued = self
            .issuer
            .issue(&claims.subject_id, current_address)
            .await
            .map_err(|e| self.reject(e))?;
        self.storage_call("persist", self.store.persist(&issued.record))
            .await
            .map_err(|e| self.reject(e))?;

        metrics::record_rotation("success");
        info!(
            subject_id = %claims.subject_id,
            previous_correlation_id = %claims.correlation_id,
            correlation_id = %issued.record.correlation_id,
            "Rotated token pair"
        );

        Ok(TokenPair {
            access: issued.access_token,
            refresh: issued.refresh_token,
        })
    }

    fn reject(&self, error: TokenError) -> TokenError {
        let status = match &error {
            TokenError::Unauthorized(reason) => reason.as_str(),
            TokenError::Storage(_) => "storage_error",
            _ => "error",
        };
        metrics::record_rotation(status);
        if !error.is_authorization_failure() {
            warn!(error = %error, "Rotation failed");
        }
        error
    }

    async fn signal_anomaly(&self, claims: &AccessClaims, current_address: &str) {
        metrics::record_address_anomaly();

        let anomaly = AddressAnomaly {
            subject_id: claims.subject_id.clone(),
            new_address: current_address.to_string(),
            previous_address: claims.bound_address.clone(),
            correlation_id: claims.correlation_id.clone(),
            detected_at: Utc::now(),
        };

        let status = match tokio::time::timeout(
            self.notification_timeout,
            self.notifier.notify(&anomaly),
        )
        .await
        {
            Ok(Ok(())) => "delivered",
            Ok(Err(e)) => {
                warn!(error = %e, subject_id = %anomaly.subject_id, "Anomaly notification failed");
                "failed"
            }
            Err(_) => {
                warn!(subject_id = %anomaly.subject_id, "Anomaly notification timed out");
                "timeout"
            }
        };
        metrics::record_notification(status);
    }

    async fn storage_call<T, F>(&self, operation: &'static str, call: F) -> Result<T, TokenError>
    where
        F: Future<Output = Result<T, TokenError>>,
    {
        let result = match tokio::time::timeout(self.storage_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TokenError::storage(format!(
                "{operation} timed out after {:?}",
                self.storage_timeout
            ))),
        };
        metrics::record_storage_operation(operation, if result.is_ok() { "ok" } else { "error" });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashCost;
    use crate::jwt::SigningSecret;
    use crate::refresh::RefreshHasher;
    use crate::session::notifier::NotifyError;
    use crate::storage::MemoryRefreshStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<AddressAnomaly>>);

    #[async_trait]
    impl AnomalyNotifier for Recorder {
        async fn notify(&self, anomaly: &AddressAnomaly) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(anomaly.clone());
            Ok(())
        }
    }

    struct Stalled;

    #[async_trait]
    impl AnomalyNotifier for Stalled {
        async fn notify(&self, _anomaly: &AddressAnomaly) -> Result<(), NotifyError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn rotator(notifier: Arc<dyn AnomalyNotifier>) -> (SessionRotator, Arc<MemoryRefreshStore>) {
        let secret = SigningSecret::new(b"rotator-test-secret-rotator-test-secret".to_vec()).unwrap();
        let codec = Arc::new(ClaimsCodec::new(&secret));
        let hasher = RefreshHasher::new(HashCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let store = Arc::new(MemoryRefreshStore::new(
            hasher.clone(),
            Duration::from_secs(86_400),
        ));
        let issuer = TokenPairIssuer::new(Arc::clone(&codec), hasher, Duration::from_secs(1800));
        let rotator = SessionRotator::new(codec, issuer, store.clone(), notifier)
            .with_notification_timeout(Duration::from_millis(50));
        (rotator, store)
    }

    fn request(pair: &TokenPair) -> RotationRequest {
        RotationRequest {
            access: pair.access.clone(),
            refresh: pair.refresh.clone(),
        }
    }

    #[tokio::test]
    async fn test_issue_persists_record_and_principal() {
        let (rotator, store) = rotator(Arc::new(Recorder::default()));
        let pair = rotator.issue("u1", "1.2.3.4").await.unwrap();

        let claims = rotator.codec.decode(&pair.access).unwrap();
        assert!(store.get(&claims.correlation_id).unwrap().is_some());
        assert_eq!(store.principal("u1").unwrap().unwrap().address, "1.2.3.4");
    }

    #[tokio::test]
    async fn test_rotation_rebinds_to_current_address() {
        let recorder = Arc::new(Recorder::default());
        let (rotator, _) = rotator(recorder.clone());
        let pair = rotator.issue("u1", "1.2.3.4").await.unwrap();

        let rotated = rotator.rotate(&request(&pair), "5.6.7.8").await.unwrap();
        let claims = rotator.codec.decode(&rotated.access).unwrap();

        assert_eq!(claims.bound_address, "5.6.7.8");
        assert_eq!(claims.subject_id, "u1");
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stalled_notifier_does_not_block_rotation() {
        let (rotator, _) = rotator(Arc::new(Stalled));
        let pair = rotator.issue("u1", "1.2.3.4").await.unwrap();

        let rotated = rotator.rotate(&request(&pair), "5.6.7.8").await;
        assert!(rotated.is_ok());
    }

    #[tokio::test]
    async fn test_garbage_access_is_unauthorized() {
        let (rotator, _) = rotator(Arc::new(Recorder::default()));
        let result = rotator
            .rotate(
                &RotationRequest {
                    access: "garbage".into(),
                    refresh: "r".into(),
                },
                "1.2.3.4",
            )
            .await;
        assert!(matches!(
            result,
            Err(TokenError::Unauthorized(RejectReason::AccessMalformed))
        ));
    }
}
