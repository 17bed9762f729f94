//! Signed encoding of access claims.
//!
//! HS512 over a process-wide secret. The library's own expiry check is
//! disabled so the boundary can be inclusive (`now >= exp` is expired) and
//! so callers can decode against an explicit instant.

use crate::error::TokenError;
use crate::jwt::claims::AccessClaims;
use crate::jwt::secret::SigningSecret;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::collections::HashSet;
use std::time::Duration;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Encodes and verifies access tokens.
pub struct ClaimsCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl ClaimsCodec {
    /// Create a codec bound to `secret`.
    #[must_use]
    pub fn new(secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.expose()),
            decoding_key: DecodingKey::from_secret(secret.expose()),
            validation,
        }
    }

    /// Encode a token issued now.
    ///
    /// # Errors
    ///
    /// Returns `Signing` if the token cannot be produced.
    pub fn encode(
        &self,
        correlation_id: &str,
        subject_id: &str,
        bound_address: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.encode_at(correlation_id, subject_id, bound_address, ttl, Utc::now())
    }

    /// Encode a token issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns `Signing` if the token cannot be produced.
    pub fn encode_at(
        &self,
        correlation_id: &str,
        subject_id: &str,
        bound_address: &str,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let ttl_seconds = i64::try_from(ttl.as_secs())
            .map_err(|_| TokenError::Signing("ttl out of range".to_string()))?;
        let claims = AccessClaims::new(
            correlation_id,
            subject_id,
            bound_address,
            issued_at,
            ttl_seconds,
        )?;
        self.sign(&claims)
    }

    fn sign(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify and decode a token against the current time.
    ///
    /// # Errors
    ///
    /// `SignatureInvalid`, `Expired` or `Malformed`.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Verify and decode a token against `now`.
    ///
    /// # Errors
    ///
    /// `SignatureInvalid` if the integrity check fails, `Expired` if
    /// `now >= exp`, `Malformed` if the structure cannot be parsed.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(TokenError::from)?;

        if data.claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

impl std::fmt::Debug for ClaimsCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsCodec")
            .field("algorithm", &ALGORITHM)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use chrono::TimeZone;

    const TTL: Duration = Duration::from_secs(1800);

    fn codec(secret: &[u8]) -> ClaimsCodec {
        ClaimsCodec::new(&SigningSecret::new(secret.to_vec()).unwrap())
    }

    fn epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let codec = codec(b"test-secret-key-for-testing-only-32bytes");
        let token = codec.encode("cid-1", "u1", "1.2.3.4", TTL).unwrap();
        let claims = codec.decode(&token).unwrap();

        assert_eq!(claims.correlation_id, "cid-1");
        assert_eq!(claims.subject_id, "u1");
        assert_eq!(claims.bound_address, "1.2.3.4");
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_expiry_boundary_inclusive() {
        let codec = codec(b"test-secret-key-for-testing-only-32bytes");
        let token = codec
            .encode_at("cid-1", "u1", "1.2.3.4", TTL, epoch())
            .unwrap();

        let just_before = epoch() + chrono::Duration::seconds(1799);
        let exactly = epoch() + chrono::Duration::seconds(1800);

        assert!(codec.decode_at(&token, just_before).is_ok());
        assert!(matches!(
            codec.decode_at(&token, exactly),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret_is_signature_invalid() {
        let issuer = codec(b"secret-a-secret-a-secret-a-secret-a!");
        let verifier = codec(b"secret-b-secret-b-secret-b-secret-b!");
        let token = issuer.encode("cid", "u1", "1.2.3.4", TTL).unwrap();

        assert!(matches!(
            verifier.decode(&token),
            Err(TokenError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_tampered_payload_is_signature_invalid() {
        let codec = codec(b"test-secret-key-for-testing-only-32bytes");
        let token = codec.encode("cid", "u1", "1.2.3.4", TTL).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let mut payload: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        payload["ip"] = serde_json::Value::String("9.9.9.9".to_string());
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap()),
            parts[2]
        );

        assert!(matches!(
            codec.decode(&forged),
            Err(TokenError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec(b"test-secret-key-for-testing-only-32bytes");
        assert!(matches!(codec.decode("not-a-token"), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.decode(""), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_foreign_claims_shape_is_malformed() {
        let secret = b"test-secret-key-for-testing-only-32bytes";
        let codec = codec(secret);
        let foreign = encode(
            &Header::new(ALGORITHM),
            &serde_json::json!({ "sub": "u1", "jti": "x", "exp": 4_000_000_000i64 }),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(matches!(codec.decode(&foreign), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_oversized_ttl_is_signing_error() {
        let codec = codec(b"test-secret-key-for-testing-only-32bytes");
        let result = codec.encode("cid", "u1", "1.2.3.4", Duration::from_secs(u64::MAX / 2));
        assert!(matches!(result, Err(TokenError::Signing(_))));
    }

    #[test]
    fn test_missing_correlation_id_is_malformed() {
        let secret = b"test-secret-key-for-testing-only-32bytes";
        let codec = codec(secret);
        let token = encode(
            &Header::new(ALGORITHM),
            &serde_json::json!({ "sub": "u1", "ip": "1.2.3.4", "iat": 1, "exp": 4_000_000_000i64 }),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(matches!(codec.decode(&token), Err(TokenError::Malformed(_))));
    }
}
