//! Error taxonomy for token issuance and rotation.
//!
//! Codec failures (`Malformed`, `SignatureInvalid`, `Expired`) are kept
//! distinct internally so they can be logged and counted, but every one of
//! them reaches the caller as the same `Unauthorized` outcome.

use std::fmt;
use thiserror::Error;

/// Why a rotation attempt was rejected. Never surfaced to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Access token could not be parsed.
    AccessMalformed,
    /// Access token signature did not verify.
    AccessSignatureInvalid,
    /// Access token was at or past its expiry.
    AccessExpired,
    /// Refresh secret did not match an active, unexpired record.
    RefreshMismatch,
}

impl RejectReason {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AccessMalformed => "access_malformed",
            Self::AccessSignatureInvalid => "access_signature_invalid",
            Self::AccessExpired => "access_expired",
            Self::RefreshMismatch => "refresh_mismatch",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the token core and its collaborators.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Token is structurally invalid.
    #[error("Token malformed: {0}")]
    Malformed(String),

    /// Token integrity check failed.
    #[error("Token signature invalid")]
    SignatureInvalid,

    /// Token is at or past its expiry instant.
    #[error("Token expired")]
    Expired,

    /// Caller-facing authorization failure.
    #[error("Unauthorized: {0}")]
    Unauthorized(RejectReason),

    /// A refresh record with the same hash or correlation id already exists.
    #[error("Refresh record conflict: {0}")]
    Conflict(String),

    /// Backing store unreachable, failed or timed out.
    #[error("Storage error: {0}")]
    Storage(String),

    /// OS entropy source failed.
    #[error("Entropy source failure: {0}")]
    Entropy(String),

    /// Access token could not be signed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Request is missing required input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an entropy error.
    pub fn entropy(msg: impl Into<String>) -> Self {
        Self::Entropy(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Whether the failure is transient. Only storage outages qualify;
    /// entropy and signing failures are fatal at this layer.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Whether the failure is attributable to the requester's credentials.
    #[must_use]
    pub const fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::Malformed(_) | Self::SignatureInvalid | Self::Expired
        )
    }

    /// Stable error code for responses and metrics.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) | Self::SignatureInvalid | Self::Expired | Self::Unauthorized(_) => {
                "UNAUTHORIZED"
            }
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Storage(_) => "STORAGE_UNAVAILABLE",
            Self::Conflict(_)
            | Self::Entropy(_)
            | Self::Signing(_)
            | Self::Config(_)
            | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Fold a codec failure into the caller-facing umbrella. Other errors
    /// pass through unchanged.
    #[must_use]
    pub fn into_unauthorized(self) -> Self {
        match self {
            Self::Malformed(_) => Self::Unauthorized(RejectReason::AccessMalformed),
            Self::SignatureInvalid => Self::Unauthorized(RejectReason::AccessSignatureInvalid),
            Self::Expired => Self::Unauthorized(RejectReason::AccessExpired),
            other => other,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::SignatureInvalid,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidRsaKey(_) => {
                Self::Signing(err.to_string())
            }
            _ => Self::Malformed(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for TokenError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::Conflict(db.message().to_string());
            }
        }
        Self::Storage(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for TokenError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Internal(format!("refresh hash: {err}"))
    }
}
