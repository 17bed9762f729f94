//! Session rotation protocol.

pub mod notifier;
pub mod pair;
pub mod rotator;

pub use notifier::{AddressAnomaly, AnomalyNotifier, NotifyError, TracingNotifier};
pub use pair::{RotationRequest, TokenPair};
pub use rotator::SessionRotator;
