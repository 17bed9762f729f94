//! PostgreSQL refresh store.

use crate::error::TokenError;
use crate::refresh::{RefreshHasher, RefreshRecord, RefreshState};
use crate::storage::RefreshStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

const MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

/// Refresh store backed by a pooled PostgreSQL connection.
#[derive(Clone)]
pub struct PostgresRefreshStore {
    pool: PgPool,
    hasher: RefreshHasher,
    refresh_ttl: Duration,
}

impl PostgresRefreshStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool, hasher: RefreshHasher, refresh_ttl: Duration) -> Self {
        Self {
            pool,
            hasher,
            refresh_ttl,
        }
    }

    /// Open a pool against `url`.
    ///
    /// # Errors
    ///
    /// `Storage` if the database is unreachable.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
        hasher: RefreshHasher,
        refresh_ttl: Duration,
    ) -> Result<Self, TokenError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::new(pool, hasher, refresh_ttl))
    }

    /// Create the `refresh_tokens` and `users` tables if missing.
    ///
    /// # Errors
    ///
    /// `Storage` if the statements fail.
    pub async fn apply_migrations(&self) -> Result<(), TokenError> {
        sqlx::raw_sql(MIGRATION).execute(&self.pool).await?;
        info!("Applied refresh store migration");
        Ok(())
    }

    /// Underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TokenError> {
        let ttl = chrono::Duration::from_std(self.refresh_ttl)
            .map_err(|e| TokenError::config(format!("refresh ttl out of range: {e}")))?;
        now.checked_sub_signed(ttl)
            .ok_or_else(|| TokenError::config("refresh ttl reaches before the earliest timestamp"))
    }
}

#[async_trait]
impl RefreshStore for PostgresRefreshStore {
    async fn persist(&self, record: &RefreshRecord) -> Result<(), TokenError> {
        sqlx::query(
            r#"INSERT INTO refresh_tokens (correlation_id, subject_id, hashed_value, state, created_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&record.correlation_id)
        .bind(&record.subject_id)
        .bind(&record.hashed_value)
        .bind(record.state.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn verify_and_consume(
        &self,
        correlation_id: &str,
        presented: &str,
    ) -> Result<bool, TokenError> {
        let now = Utc::now();
        let cutoff = self.cutoff(now)?;

        let candidate: Option<(String,)> = sqlx::query_as(
            r#"SELECT hashed_value FROM refresh_tokens
               WHERE correlation_id = $1 AND state = $2 AND created_at > $3"#,
        )
        .bind(correlation_id)
        .bind(RefreshState::Active.as_str())
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        let Some((hashed_value,)) = candidate else {
            return Ok(false);
        };

        if !self
            .hasher
            .verify_blocking(presented.to_string(), hashed_value.clone())
            .await?
        {
            return Ok(false);
        }

        // Only the caller whose update flips the row wins.
        let result = sqlx::query(
            r#"UPDATE refresh_tokens SET state = $1, consumed_at = $2
               WHERE correlation_id = $3 AND hashed_value = $4 AND state = $5 AND created_at > $6"#,
        )
        .bind(RefreshState::Consumed.as_str())
        .bind(now)
        .bind(correlation_id)
        .bind(&hashed_value)
        .bind(RefreshState::Active.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        let consumed = result.rows_affected() == 1;
        debug!(correlation_id = %correlation_id, consumed, "Refresh consume attempted");
        Ok(consumed)
    }

    async fn record_principal(&self, subject_id: &str, address: &str) -> Result<(), TokenError> {
        sqlx::query(
            r#"INSERT INTO users (guid, current_ip_sign_in, last_sign_in_at)
               VALUES ($1, $2, $3)
               ON CONFLICT (guid) DO UPDATE
               SET current_ip_sign_in = excluded.current_ip_sign_in,
                   last_sign_in_at = excluded.last_sign_in_at"#,
        )
        .bind(subject_id)
        .bind(address)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashCost;

    fn store(refresh_ttl: Duration) -> PostgresRefreshStore {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/guid_token_unused")
            .unwrap();
        let hasher = RefreshHasher::new(HashCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        PostgresRefreshStore::new(pool, hasher, refresh_ttl)
    }

    #[tokio::test]
    async fn test_cutoff_is_now_minus_ttl() {
        let now = Utc::now();
        let cutoff = store(Duration::from_secs(86_400)).cutoff(now).unwrap();
        assert_eq!(now - cutoff, chrono::Duration::seconds(86_400));
    }

    #[tokio::test]
    async fn test_oversized_ttl_cutoff_is_config_error() {
        let result = store(Duration::from_secs(1_000_000_000_000_000)).cutoff(Utc::now());
        assert!(matches!(result, Err(TokenError::Config(_))));
    }
}
