//! taskfn - cache admin function
//!
//! Serves the cache admin routes behind the shared dispatcher, with a
//! resilient cache client over Redis or the in-memory backend.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskfn::api::{create_router, AppState};
use taskfn::cache::{MemoryConnector, ResilientCacheClient};
use taskfn::{ops, spawn_cleanup_task, AuthMode, Config, Dispatcher, TokenValidator};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables and secrets
/// 3. Connect the cache client (Redis if configured, else in-memory)
/// 4. Build the dispatcher over the cache admin routes
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM, then release the cache
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskfn=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting taskfn");

    let config = Config::from_env();
    info!(?config, "Configuration loaded");

    let auth = if config.public_api {
        warn!("PUBLIC_API is set, bearer authentication disabled");
        AuthMode::Public
    } else {
        let secret = config
            .jwt_secret
            .as_deref()
            .context("JWT_SECRET or the jwt-secret secret must be set")?;
        AuthMode::Bearer(Arc::new(TokenValidator::new(secret.as_bytes())))
    };

    let (cache, cleanup_handle) = connect_cache(&config).await;
    let cache = Arc::new(cache);

    let dispatcher = Dispatcher::new(ops::routes(cache.clone()), ops::classifier(), auth);
    let app = create_router(AppState::new(dispatcher));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = cleanup_handle {
        handle.abort();
    }
    cache.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Builds the cache client. The in-memory backend also gets its cleanup task.
async fn connect_cache(config: &Config) -> (ResilientCacheClient, Option<JoinHandle<()>>) {
    let policy = config.retry_policy();

    match config.redis_connector() {
        Some(connector) => {
            let client = ResilientCacheClient::connect(connector, policy)
                .await
                .with_default_ttl(config.default_ttl);
            (client, None)
        }
        None => {
            info!("REDIS_HOST not set, using in-memory cache");
            let connector = MemoryConnector::new();
            let cleanup = spawn_cleanup_task(connector.store(), config.cleanup_interval);
            let client = ResilientCacheClient::connect(connector, policy)
                .await
                .with_default_ttl(config.default_ttl);
            (client, Some(cleanup))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
