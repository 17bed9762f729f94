//! Address-drift side channel.
//!
//! The core decides that a notification fires and what it carries; how it
//! is delivered belongs to the implementation behind [`AnomalyNotifier`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Payload of an address-mismatch notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressAnomaly {
    /// Subject whose token was presented
    pub subject_id: String,
    /// Address observed on this request
    pub new_address: String,
    /// Address bound into the access token
    pub previous_address: String,
    /// Pair the token belonged to
    pub correlation_id: String,
    /// Detection instant
    pub detected_at: DateTime<Utc>,
}

/// Delivery failure reported by a notifier.
#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Receives address anomalies.
#[async_trait]
pub trait AnomalyNotifier: Send + Sync {
    /// Deliver one anomaly.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the caller logs and drops the error.
    async fn notify(&self, anomaly: &AddressAnomaly) -> Result<(), NotifyError>;
}

/// Emits anomalies as structured `warn` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl AnomalyNotifier for TracingNotifier {
    async fn notify(&self, anomaly: &AddressAnomaly) -> Result<(), NotifyError> {
        warn!(
            event_type = "ADDRESS_CHANGED",
            subject_id = %anomaly.subject_id,
            new_address = %anomaly.new_address,
            previous_address = %anomaly.previous_address,
            correlation_id = %anomaly.correlation_id,
            "Token presented from a different address"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracing_notifier_never_fails() {
        let anomaly = AddressAnomaly {
            subject_id: "u1".into(),
            new_address: "5.6.7.8".into(),
            previous_address: "1.2.3.4".into(),
            correlation_id: "cid".into(),
            detected_at: Utc::now(),
        };
        assert!(TracingNotifier.notify(&anomaly).await.is_ok());
    }

    #[test]
    fn test_payload_serializes() {
        let anomaly = AddressAnomaly {
            subject_id: "u1".into(),
            new_address: "5.6.7.8".into(),
            previous_address: "1.2.3.4".into(),
            correlation_id: "cid".into(),
            detected_at: Utc::now(),
        };
        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["subject_id"], "u1");
        assert_eq!(json["new_address"], "5.6.7.8");
    }
}
