//! GUID token service entry point.

use anyhow::Context;
use guid_token::config::{Config, StorageBackend};
use guid_token::http::{self, AppState};
use guid_token::jwt::ClaimsCodec;
use guid_token::observability;
use guid_token::refresh::{RefreshHasher, TokenPairIssuer};
use guid_token::session::{SessionRotator, TracingNotifier};
use guid_token::shutdown;
use guid_token::storage::{MemoryRefreshStore, PostgresRefreshStore, RefreshStore};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    observability::init_tracing(&config.log_level, config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.bind_address(),
        "Starting GUID token service"
    );

    let codec = Arc::new(ClaimsCodec::new(&config.jwt_secret));
    let hasher = RefreshHasher::new(config.hash_cost)?;
    let store = build_store(&config, hasher.clone()).await?;
    let issuer = TokenPairIssuer::new(Arc::clone(&codec), hasher, config.access_token_ttl);

    let rotator = SessionRotator::new(codec, issuer, store, Arc::new(TracingNotifier))
        .with_storage_timeout(config.storage_timeout)
        .with_notification_timeout(config.notification_timeout);

    let state = AppState {
        rotator: Arc::new(rotator),
        trust_forwarded_for: config.trust_forwarded_for,
    };
    let app = http::router(state, config.request_timeout);

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), "Listening");

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown::wait_for_signal().await;
        let _ = stop_tx.send(true);
    });

    let mut graceful_rx = stop_rx.clone();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = graceful_rx.changed().await;
    });

    let mut drain_rx = stop_rx;
    let drained = shutdown::drain_within(
        server.into_future(),
        async move {
            let _ = drain_rx.changed().await;
        },
        config.shutdown_timeout,
    )
    .await
    .context("Server error")?;

    if !drained {
        warn!("Open connections dropped at shutdown");
    }
    info!("Shutdown complete");
    Ok(())
}

async fn build_store(
    config: &Config,
    hasher: RefreshHasher,
) -> anyhow::Result<Arc<dyn RefreshStore>> {
    match &config.storage {
        StorageBackend::Postgres {
            url,
            max_connections,
        } => {
            let store = PostgresRefreshStore::connect(
                url,
                *max_connections,
                config.storage_timeout,
                hasher,
                config.refresh_token_ttl,
            )
            .await
            .context("Failed to connect to PostgreSQL")?;

            if config.apply_migrations {
                store.apply_migrations().await?;
            }
            info!(max_connections, "Using PostgreSQL refresh store");
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory refresh store; records are lost on restart");
            Ok(Arc::new(MemoryRefreshStore::new(
                hasher,
                config.refresh_token_ttl,
            )))
        }
    }
}
