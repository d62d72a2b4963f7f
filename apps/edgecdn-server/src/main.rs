//! edgecdn server binary.
//!
//! Wires the tenant registry, object cache, and S3 store adapter into
//! the edge HTTP service and runs it until a shutdown signal arrives.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EDGE_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `EDGE_LOG_LEVEL` | `info` | Log level filter |
//! | `EDGE_API_URL` | *(required)* | Tenant metadata service base URL |
//! | `EDGE_API_KEY` | *(required)* | Metadata service credential |
//! | `EDGE_REFRESH_INTERVAL_SECS` | `60` | Tenant refresh interval |
//! | `EDGE_CACHE_RESET_INTERVAL_SECS` | `3600` | Full cache reset interval |
//! | `EDGE_S3_ENDPOINT` | *(unset)* | Custom S3 endpoint (MinIO) |
//! | `EDGE_S3_REGION` | `us-east-1` | S3 region |
//! | `EDGE_S3_ACCESS_KEY_ID` | *(empty)* | S3 access key ID |
//! | `EDGE_S3_SECRET_ACCESS_KEY` | *(empty)* | S3 secret access key |
//! | `EDGE_S3_BUCKET` | `edgecdn` | Bucket holding tenant objects |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `EDGE_LOG_LEVEL`) |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use edgecdn_core::{
    EdgeConfig, HttpTenantSource, ObjectCache, ObjectStore, S3ObjectStore, TenantRegistry,
};
use edgecdn_http::EdgeHttpService;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `EDGE_LOG_LEVEL`
/// config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal is
/// received.
async fn serve<S: ObjectStore>(
    listener: TcpListener,
    service: EdgeHttpService<S>,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = EdgeConfig::from_env();

    init_tracing(&config.log_level)?;

    anyhow::ensure!(
        !config.api_url.is_empty(),
        "EDGE_API_URL must be set to the tenant metadata service URL"
    );
    anyhow::ensure!(!config.api_key.is_empty(), "EDGE_API_KEY must be set");

    info!(
        listen = %config.listen,
        api_url = %config.api_url,
        s3_bucket = %config.s3_bucket,
        refresh_interval_secs = config.refresh_interval_secs,
        cache_reset_interval_secs = config.cache_reset_interval_secs,
        version = env!("CARGO_PKG_VERSION"),
        "starting edgecdn server",
    );

    let store = Arc::new(S3ObjectStore::from_config(&config).await);

    let cache = Arc::new(ObjectCache::new());
    cache.spawn_reset(Duration::from_secs(config.cache_reset_interval_secs));

    // Fail-fast: the initial tenant fetch must succeed for the server to
    // come up; afterwards refresh failures only log.
    let source = Arc::new(HttpTenantSource::new(
        config.api_url.clone(),
        config.api_key.clone(),
    ));
    let registry = TenantRegistry::new(source, Arc::clone(&cache))
        .await
        .context("initial tenant list fetch failed")?;
    registry.spawn_refresh(Duration::from_secs(config.refresh_interval_secs));

    let service = EdgeHttpService::new(Arc::clone(&registry), Arc::clone(&cache), store);

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("cannot bind to {}", config.listen))?;
    info!(listen = %config.listen, "listening");

    let result = serve(listener, service).await;

    registry.shutdown();
    cache.shutdown();

    result
}
