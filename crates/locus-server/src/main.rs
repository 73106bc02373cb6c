//! Locus server binary

use std::{env, sync::Arc};

use locus_client::{init_tracing, VenueResolver};
use locus_core::RedisRateLimiter;
use locus_server::{
    app,
    config::{ServerConfig, OTEL_ENDPOINT_VAR},
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let otel_endpoint = env::var(OTEL_ENDPOINT_VAR).ok();
    let _telemetry = init_tracing(otel_endpoint.as_deref())?;

    let config = ServerConfig::load()?;

    let mut builder = VenueResolver::builder(config.engine.clone());
    if let Some(redis_url) = config.redis_url.as_deref() {
        info!("Using shared rate limits from Redis");
        let limiter = RedisRateLimiter::new(redis_url)
            .await?
            .with_config_quotas(&config.engine);
        builder = builder.rate_gate(Arc::new(limiter));
    }
    let resolver = builder.build()?;

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(resolver))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
