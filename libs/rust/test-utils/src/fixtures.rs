//! Pre-assembled rotators over the in-memory store.

use crate::mocks::{CountingStore, RecordingNotifier};
use guid_token::config::HashCost;
use guid_token::jwt::{ClaimsCodec, SigningSecret};
use guid_token::refresh::{RefreshHasher, TokenPairIssuer};
use guid_token::session::{AnomalyNotifier, SessionRotator};
use guid_token::storage::{MemoryRefreshStore, RefreshStore};
use std::sync::Arc;
use std::time::Duration;

/// Signing secret used across tests.
pub const TEST_SECRET: &[u8] = b"test-signing-secret-for-guid-token-service-0001";

/// A different secret, for signature mismatch tests.
pub const OTHER_SECRET: &[u8] = b"another-signing-secret-for-guid-token-service-02";

/// Access token TTL used by fixtures.
pub const ACCESS_TTL: Duration = Duration::from_secs(1800);

/// Refresh record TTL used by fixtures.
pub const REFRESH_TTL: Duration = Duration::from_secs(86_400);

/// Argon2 cost small enough for hundreds of hashes per test.
#[must_use]
pub const fn cheap_hash_cost() -> HashCost {
    HashCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

/// Hasher with [`cheap_hash_cost`].
///
/// # Panics
///
/// Never for the fixed cost above.
#[must_use]
#[allow(clippy::expect_used)]
pub fn cheap_hasher() -> RefreshHasher {
    RefreshHasher::new(cheap_hash_cost()).expect("cheap argon2 params are valid")
}

/// Codec over `secret`.
///
/// # Panics
///
/// If `secret` is empty.
#[must_use]
#[allow(clippy::expect_used)]
pub fn codec_with(secret: &[u8]) -> ClaimsCodec {
    let secret = SigningSecret::new(secret.to_vec()).expect("non-empty test secret");
    ClaimsCodec::new(&secret)
}

/// Codec over [`TEST_SECRET`].
#[must_use]
pub fn test_codec() -> Arc<ClaimsCodec> {
    Arc::new(codec_with(TEST_SECRET))
}

/// Empty in-memory store with cheap hashing and [`REFRESH_TTL`].
#[must_use]
pub fn memory_store() -> Arc<MemoryRefreshStore> {
    Arc::new(MemoryRefreshStore::new(cheap_hasher(), REFRESH_TTL))
}

/// Issuer sharing `codec`.
#[must_use]
pub fn issuer(codec: &Arc<ClaimsCodec>) -> TokenPairIssuer {
    TokenPairIssuer::new(Arc::clone(codec), cheap_hasher(), ACCESS_TTL)
}

/// A rotator together with the collaborators tests inspect.
pub struct Harness {
    /// Codec the rotator signs with
    pub codec: Arc<ClaimsCodec>,
    /// Backing store
    pub memory: Arc<MemoryRefreshStore>,
    /// Counting wrapper the rotator talks to
    pub store: Arc<CountingStore>,
    /// The rotator under test
    pub rotator: Arc<SessionRotator>,
}

impl Harness {
    /// Harness over a fresh memory store and `notifier`.
    #[must_use]
    pub fn with_notifier(notifier: Arc<dyn AnomalyNotifier>) -> Self {
        let codec = test_codec();
        let memory = memory_store();
        let store = Arc::new(CountingStore::new(
            Arc::clone(&memory) as Arc<dyn RefreshStore>
        ));
        let rotator = SessionRotator::new(
            Arc::clone(&codec),
            issuer(&codec),
            Arc::clone(&store) as Arc<dyn RefreshStore>,
            notifier,
        )
        .with_notification_timeout(Duration::from_millis(200));

        Self {
            codec,
            memory,
            store,
            rotator: Arc::new(rotator),
        }
    }

    /// Harness with a [`RecordingNotifier`], returned alongside.
    #[must_use]
    pub fn recording() -> (Self, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        (
            Self::with_notifier(Arc::clone(&notifier) as Arc<dyn AnomalyNotifier>),
            notifier,
        )
    }
}

/// Rotator over `store` with a recording notifier.
#[must_use]
pub fn rotator_over(store: Arc<dyn RefreshStore>) -> SessionRotator {
    let codec = test_codec();
    SessionRotator::new(
        Arc::clone(&codec),
        issuer(&codec),
        store,
        Arc::new(RecordingNotifier::new()),
    )
    .with_storage_timeout(Duration::from_millis(500))
}
