//! In-process refresh store.
//!
//! Records live in a map guarded by a mutex. The hash check runs outside
//! the lock; the state flip re-checks under the lock, mirroring the
//! conditional update of the SQL backend.

use crate::error::TokenError;
use crate::refresh::{RefreshHasher, RefreshRecord, RefreshState};
use crate::storage::RefreshStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Last observed sign-in for a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalEntry {
    /// Address of the last sign-in
    pub address: String,
    /// Time of the last sign-in
    pub last_sign_in_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, RefreshRecord>,
    principals: HashMap<String, PrincipalEntry>,
}

/// Refresh store backed by process memory.
pub struct MemoryRefreshStore {
    inner: Mutex<Inner>,
    hasher: RefreshHasher,
    refresh_ttl: Duration,
}

impl MemoryRefreshStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(hasher: RefreshHasher, refresh_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            hasher,
            refresh_ttl,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, TokenError> {
        self.inner
            .lock()
            .map_err(|_| TokenError::storage("memory store lock poisoned"))
    }

    /// Snapshot of a record.
    ///
    /// # Errors
    ///
    /// `Storage` if the lock is poisoned.
    pub fn get(&self, correlation_id: &str) -> Result<Option<RefreshRecord>, TokenError> {
        Ok(self.lock()?.records.get(correlation_id).cloned())
    }

    /// Snapshot of a principal entry.
    ///
    /// # Errors
    ///
    /// `Storage` if the lock is poisoned.
    pub fn principal(&self, subject_id: &str) -> Result<Option<PrincipalEntry>, TokenError> {
        Ok(self.lock()?.principals.get(subject_id).cloned())
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// `Storage` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, TokenError> {
        Ok(self.lock()?.records.len())
    }

    /// Whether the store holds no records.
    ///
    /// # Errors
    ///
    /// `Storage` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, TokenError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl RefreshStore for MemoryRefreshStore {
    async fn persist(&self, record: &RefreshRecord) -> Result<(), TokenError> {
        let mut inner = self.lock()?;

        if inner.records.contains_key(&record.correlation_id) {
            return Err(TokenError::Conflict(format!(
                "correlation id {} already stored",
                record.correlation_id
            )));
        }
        if inner
            .records
            .values()
            .any(|r| r.hashed_value == record.hashed_value)
        {
            return Err(TokenError::Conflict("refresh hash already stored".to_string()));
        }

        inner
            .records
            .insert(record.correlation_id.clone(), record.clone());
        Ok(())
    }

    async fn verify_and_consume(
        &self,
        correlation_id: &str,
        presented: &str,
    ) -> Result<bool, TokenError> {
        let now = Utc::now();
        let candidate = {
            let inner = self.lock()?;
            match inner.records.get(correlation_id) {
                Some(rec) if rec.is_redeemable(self.refresh_ttl, now) => rec.hashed_value.clone(),
                _ => return Ok(false),
            }
        };

        if !self
            .hasher
            .verify_blocking(presented.to_string(), candidate.clone())
            .await?
        {
            return Ok(false);
        }

        let mut inner = self.lock()?;
        match inner.records.get_mut(correlation_id) {
            Some(rec) if rec.state == RefreshState::Active && rec.hashed_value == candidate => {
                rec.state = RefreshState::Consumed;
                debug!(correlation_id = %correlation_id, "Refresh record consumed");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_principal(&self, subject_id: &str, address: &str) -> Result<(), TokenError> {
        self.lock()?.principals.insert(
            subject_id.to_string(),
            PrincipalEntry {
                address: address.to_string(),
                last_sign_in_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashCost;
    use std::sync::Arc;

    fn hasher() -> RefreshHasher {
        RefreshHasher::new(HashCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn store() -> MemoryRefreshStore {
        MemoryRefreshStore::new(hasher(), Duration::from_secs(86_400))
    }

    fn record(correlation_id: &str, secret: &str, created_at: DateTime<Utc>) -> RefreshRecord {
        RefreshRecord::new(
            correlation_id.to_string(),
            "u1".to_string(),
            hasher().hash(secret).unwrap(),
            created_at,
        )
    }

    #[tokio::test]
    async fn test_consume_once() {
        let store = store();
        store.persist(&record("c1", "s1", Utc::now())).await.unwrap();

        assert!(store.verify_and_consume("c1", "s1").await.unwrap());
        assert!(!store.verify_and_consume("c1", "s1").await.unwrap());
        assert_eq!(store.get("c1").unwrap().unwrap().state, RefreshState::Consumed);
    }

    #[tokio::test]
    async fn test_wrong_secret_does_not_mutate() {
        let store = store();
        store.persist(&record("c1", "s1", Utc::now())).await.unwrap();

        assert!(!store.verify_and_consume("c1", "wrong").await.unwrap());
        assert_eq!(store.get("c1").unwrap().unwrap().state, RefreshState::Active);
        assert!(store.verify_and_consume("c1", "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unbounded_ttl_consumes_without_overflow() {
        let store = MemoryRefreshStore::new(hasher(), Duration::from_secs(1_000_000_000_000_000));
        assert!(!store.verify_and_consume("c", "s").await.unwrap());

        store.persist(&record("c1", "s1", Utc::now())).await.unwrap();
        assert!(store.verify_and_consume("c1", "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_correlation_id() {
        assert!(!store().verify_and_consume("missing", "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_record_does_not_match() {
        let store = store();
        let created = Utc::now() - chrono::Duration::hours(25);
        store.persist(&record("c1", "s1", created)).await.unwrap();

        assert!(!store.verify_and_consume("c1", "s1").await.unwrap());
        assert_eq!(store.get("c1").unwrap().unwrap().state, RefreshState::Active);
    }

    #[tokio::test]
    async fn test_duplicate_persist_conflicts() {
        let store = store();
        let rec = record("c1", "s1", Utc::now());
        store.persist(&rec).await.unwrap();

        assert!(matches!(store.persist(&rec).await, Err(TokenError::Conflict(_))));

        let mut same_hash = rec.clone();
        same_hash.correlation_id = "c2".to_string();
        assert!(matches!(
            store.persist(&same_hash).await,
            Err(TokenError::Conflict(_))
        ));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consume_single_winner() {
        let store = Arc::new(store());
        store.persist(&record("c1", "s1", Utc::now())).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.verify_and_consume("c1", "s1").await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_record_principal_overwrites() {
        let store = store();
        store.record_principal("u1", "1.2.3.4").await.unwrap();
        store.record_principal("u1", "5.6.7.8").await.unwrap();
        assert_eq!(store.principal("u1").unwrap().unwrap().address, "5.6.7.8");
        assert!(store.is_empty().unwrap());
    }
}
