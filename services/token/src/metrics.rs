//! Prometheus metrics for the GUID token service.

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec, Encoder, TextEncoder};

/// Token pairs issued counter.
pub static PAIRS_ISSUED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "guid_token_pairs_issued_total",
        "Total number of access/refresh pairs issued"
    )
    .expect("Failed to register pairs_issued metric")
});

/// Rotation attempts by outcome.
pub static ROTATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "guid_token_rotations_total",
        "Total number of rotation attempts",
        &["status"]
    )
    .expect("Failed to register rotations metric")
});

/// Address mismatches observed during rotation.
pub static ADDRESS_ANOMALIES: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "guid_token_address_anomalies_total",
        "Total number of rotations presented from a different address"
    )
    .expect("Failed to register address_anomalies metric")
});

/// Anomaly notification deliveries by outcome.
pub static NOTIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "guid_token_notifications_total",
        "Total number of anomaly notifications",
        &["status"]
    )
    .expect("Failed to register notifications metric")
});

/// Storage operations counter.
pub static STORAGE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "guid_token_storage_operations_total",
        "Total number of refresh store operations",
        &["operation", "status"]
    )
    .expect("Failed to register storage_operations metric")
});

/// Record a pair issuance.
pub fn record_pair_issued() {
    PAIRS_ISSUED.inc();
}

/// Record a rotation outcome.
pub fn record_rotation(status: &str) {
    ROTATIONS.with_label_values(&[status]).inc();
}

/// Record an address anomaly.
pub fn record_address_anomaly() {
    ADDRESS_ANOMALIES.inc();
}

/// Record a notification outcome.
pub fn record_notification(status: &str) {
    NOTIFICATIONS.with_label_values(&[status]).inc();
}

/// Record a storage operation.
pub fn record_storage_operation(operation: &str, status: &str) {
    STORAGE_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

/// Render the default registry in text exposition format.
#[must_use]
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rotation() {
        record_rotation("success");
        let value = ROTATIONS.with_label_values(&["success"]).get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_storage_operation() {
        record_storage_operation("persist", "ok");
        let value = STORAGE_OPERATIONS
            .with_label_values(&["persist", "ok"])
            .get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_render_contains_registered_metrics() {
        record_pair_issued();
        let text = render();
        assert!(text.contains("guid_token_pairs_issued_total"));
    }
}
