//! Mock collaborators for rotation tests.

use async_trait::async_trait;
use guid_token::error::TokenError;
use guid_token::refresh::RefreshRecord;
use guid_token::session::{AddressAnomaly, AnomalyNotifier, NotifyError};
use guid_token::storage::RefreshStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Notifier that keeps every anomaly it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    anomalies: RwLock<Vec<AddressAnomaly>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All anomalies received so far.
    pub async fn anomalies(&self) -> Vec<AddressAnomaly> {
        self.anomalies.read().await.clone()
    }

    /// Number of anomalies received.
    pub async fn count(&self) -> usize {
        self.anomalies.read().await.len()
    }
}

#[async_trait]
impl AnomalyNotifier for RecordingNotifier {
    async fn notify(&self, anomaly: &AddressAnomaly) -> Result<(), NotifyError> {
        self.anomalies.write().await.push(anomaly.clone());
        Ok(())
    }
}

/// Notifier whose delivery always fails.
#[derive(Debug, Default)]
pub struct FailingNotifier {
    attempts: AtomicUsize,
}

impl FailingNotifier {
    /// Create a failing notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivery attempts made.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnomalyNotifier for FailingNotifier {
    async fn notify(&self, _anomaly: &AddressAnomaly) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError("mail relay unreachable".to_string()))
    }
}

/// Store wrapper counting calls per operation.
pub struct CountingStore {
    inner: Arc<dyn RefreshStore>,
    persists: AtomicUsize,
    consumes: AtomicUsize,
    principals: AtomicUsize,
}

impl CountingStore {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn RefreshStore>) -> Self {
        Self {
            inner,
            persists: AtomicUsize::new(0),
            consumes: AtomicUsize::new(0),
            principals: AtomicUsize::new(0),
        }
    }

    /// `persist` calls.
    #[must_use]
    pub fn persists(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }

    /// `verify_and_consume` calls.
    #[must_use]
    pub fn consumes(&self) -> usize {
        self.consumes.load(Ordering::SeqCst)
    }

    /// `record_principal` calls.
    #[must_use]
    pub fn principals(&self) -> usize {
        self.principals.load(Ordering::SeqCst)
    }

    /// Calls of any kind.
    #[must_use]
    pub fn total(&self) -> usize {
        self.persists() + self.consumes() + self.principals()
    }
}

#[async_trait]
impl RefreshStore for CountingStore {
    async fn persist(&self, record: &RefreshRecord) -> Result<(), TokenError> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        self.inner.persist(record).await
    }

    async fn verify_and_consume(
        &self,
        correlation_id: &str,
        presented: &str,
    ) -> Result<bool, TokenError> {
        self.consumes.fetch_add(1, Ordering::SeqCst);
        self.inner.verify_and_consume(correlation_id, presented).await
    }

    async fn record_principal(&self, subject_id: &str, address: &str) -> Result<(), TokenError> {
        self.principals.fetch_add(1, Ordering::SeqCst);
        self.inner.record_principal(subject_id, address).await
    }
}

/// Store whose backend is always down.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

#[async_trait]
impl RefreshStore for UnavailableStore {
    async fn persist(&self, _record: &RefreshRecord) -> Result<(), TokenError> {
        Err(TokenError::storage("connection refused"))
    }

    async fn verify_and_consume(
        &self,
        _correlation_id: &str,
        _presented: &str,
    ) -> Result<bool, TokenError> {
        Err(TokenError::storage("connection refused"))
    }

    async fn record_principal(&self, _subject_id: &str, _address: &str) -> Result<(), TokenError> {
        Err(TokenError::storage("connection refused"))
    }
}
