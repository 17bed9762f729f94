//! Refresh credential storage.
//!
//! The store exclusively owns persisted refresh records. Consumption is a
//! compare-and-set on state (`active -> consumed`) that reports whether it
//! took effect, so exactly one of N racing callers with the same secret
//! observes a match.

pub mod memory;
pub mod postgres;

pub use memory::MemoryRefreshStore;
pub use postgres::PostgresRefreshStore;

use crate::error::TokenError;
use crate::refresh::RefreshRecord;
use async_trait::async_trait;

/// Contract of the refresh credential store.
#[async_trait]
pub trait RefreshStore: Send + Sync {
    /// Insert a new active record.
    ///
    /// # Errors
    ///
    /// `Conflict` if the hash or correlation id already exists, `Storage`
    /// if the backend fails.
    async fn persist(&self, record: &RefreshRecord) -> Result<(), TokenError>;

    /// Verify `presented` against the active, unexpired record for
    /// `correlation_id` and atomically mark it consumed on a match.
    /// Returns `false` with no mutation for a wrong secret, a consumed
    /// record, an expired record or an unknown correlation id.
    ///
    /// # Errors
    ///
    /// `Storage` if the backend fails.
    async fn verify_and_consume(
        &self,
        correlation_id: &str,
        presented: &str,
    ) -> Result<bool, TokenError>;

    /// Best-effort log of a principal signing in from `address`. Never
    /// read back.
    ///
    /// # Errors
    ///
    /// `Storage` if the backend fails; callers log and continue.
    async fn record_principal(&self, subject_id: &str, address: &str) -> Result<(), TokenError>;
}
