use crate::error::TokenError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed payload of an access token.
///
/// Field names on the wire follow registered JWT claims where one exists
/// (`jti`, `sub`, `iat`, `exp`); the bound address travels as `ip`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Ties the access token to its refresh record
    #[serde(rename = "jti")]
    pub correlation_id: String,
    /// Externally supplied subject GUID, not validated for format
    #[serde(rename = "sub")]
    pub subject_id: String,
    /// Network address the pair was issued to
    #[serde(rename = "ip")]
    pub bound_address: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds; always `iat + ttl`
    pub exp: i64,
}

impl AccessClaims {
    /// Build claims issued at `issued_at` and valid for `ttl_seconds`.
    ///
    /// # Errors
    ///
    /// `Signing` if the expiry does not fit in a unix timestamp.
    pub fn new(
        correlation_id: impl Into<String>,
        subject_id: impl Into<String>,
        bound_address: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> Result<Self, TokenError> {
        let iat = issued_at.timestamp();
        let exp = iat
            .checked_add(ttl_seconds)
            .ok_or_else(|| TokenError::Signing("access token expiry out of range".to_string()))?;
        Ok(Self {
            correlation_id: correlation_id.into(),
            subject_id: subject_id.into(),
            bound_address: bound_address.into(),
            iat,
            exp,
        })
    }

    /// Inclusive expiry: a token whose `exp` equals `now` is expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Whether `address` differs from the address bound at issuance.
    #[must_use]
    pub fn address_differs(&self, address: &str) -> bool {
        self.bound_address != address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(now: DateTime<Utc>) -> AccessClaims {
        AccessClaims::new("cid-1", "u1", "1.2.3.4", now, 1800).unwrap()
    }

    #[test]
    fn test_expiry_is_issued_at_plus_ttl() {
        let now = Utc::now();
        let claims = sample(now);
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let claims = sample(now);

        assert!(!claims.is_expired_at(now + Duration::seconds(1799)));
        assert!(claims.is_expired_at(now + Duration::seconds(1800)));
        assert!(claims.is_expired_at(now + Duration::seconds(1801)));
    }

    #[test]
    fn test_wire_names() {
        let claims = sample(Utc::now());
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["jti"], "cid-1");
        assert_eq!(json["sub"], "u1");
        assert_eq!(json["ip"], "1.2.3.4");
        assert!(json.get("correlation_id").is_none());
    }

    #[test]
    fn test_address_differs() {
        let claims = sample(Utc::now());
        assert!(!claims.address_differs("1.2.3.4"));
        assert!(claims.address_differs("5.6.7.8"));
    }

    #[test]
    fn test_overflowing_expiry_is_rejected() {
        let result = AccessClaims::new("cid-1", "u1", "1.2.3.4", Utc::now(), i64::MAX);
        assert!(matches!(result, Err(TokenError::Signing(_))));
    }
}
