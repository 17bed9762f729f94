use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Lifecycle of a refresh record. `Active -> Consumed` is the only
/// transition and it is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// May be exchanged once
    Active,
    /// Already exchanged
    Consumed,
}

impl RefreshState {
    /// Column value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Consumed => "consumed",
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted, hashed form of an issued refresh secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    /// Correlation id shared with the paired access token
    pub correlation_id: String,
    /// Subject the pair was issued to
    pub subject_id: String,
    /// Argon2id PHC string of the secret
    pub hashed_value: String,
    /// Current state
    pub state: RefreshState,
    /// Issuance instant; validity ends at `created_at + refresh_ttl`
    pub created_at: DateTime<Utc>,
}

impl RefreshRecord {
    /// New active record.
    #[must_use]
    pub fn new(
        correlation_id: String,
        subject_id: String,
        hashed_value: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            correlation_id,
            subject_id,
            hashed_value,
            state: RefreshState::Active,
            created_at,
        }
    }

    /// Age is strictly below `ttl` at `now`. A window that ends beyond the
    /// representable range never closes.
    #[must_use]
    pub fn is_within_ttl(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .map_or(true, |expires_at| now < expires_at)
    }

    /// Active and within `ttl` at `now`.
    #[must_use]
    pub fn is_redeemable(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.state == RefreshState::Active && self.is_within_ttl(ttl, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    fn record(created_at: DateTime<Utc>) -> RefreshRecord {
        RefreshRecord::new("cid".into(), "u1".into(), "hash".into(), created_at)
    }

    #[test]
    fn test_new_record_is_active() {
        let rec = record(Utc::now());
        assert_eq!(rec.state, RefreshState::Active);
        assert!(rec.is_redeemable(DAY, Utc::now()));
    }

    #[test]
    fn test_ttl_boundary() {
        let created = Utc::now();
        let rec = record(created);
        assert!(rec.is_within_ttl(DAY, created + chrono::Duration::seconds(86_399)));
        assert!(!rec.is_within_ttl(DAY, created + chrono::Duration::seconds(86_400)));
    }

    #[test]
    fn test_consumed_is_not_redeemable() {
        let mut rec = record(Utc::now());
        rec.state = RefreshState::Consumed;
        assert!(!rec.is_redeemable(DAY, Utc::now()));
    }

    #[test]
    fn test_unrepresentable_ttl_does_not_overflow() {
        let rec = record(Utc::now());
        let huge = Duration::from_secs(1_000_000_000_000_000);
        assert!(rec.is_within_ttl(huge, Utc::now()));

        let rec = record(DateTime::<Utc>::MAX_UTC - chrono::Duration::seconds(10));
        assert!(rec.is_within_ttl(DAY, Utc::now()));
    }
}
