mod cli;
mod config;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::AppConfig;
use orbital_api::{create_app, AppState};
use orbital_geo::load_geolocator;
use orbital_services::{IngestConfig, IngestListener, IngestMetrics, SyntheticLoad, SyntheticLoadConfig};
use orbital_stream::BroadcastHub;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "orbital=info,orbital_services=info,orbital_api=info,orbital_stream=info,orbital_geo=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli).context("failed to load configuration")?;

    if cli.test > 0 {
        let target = resolve(&config.udp_addr()).await?;
        SyntheticLoad::new(SyntheticLoadConfig {
            target,
            count: cli.test,
            interval: Duration::from_micros(cli.test_interval_us),
        })
        .run()
        .await?;
        return Ok(());
    }

    info!("🚀 Starting Orbital event stream");
    info!("🌐 HTTP stream will bind to: {}", config.http_addr());
    info!("📡 UDP ingest will bind to: {}", config.udp_addr());

    let shutdown = CancellationToken::new();
    let hub = BroadcastHub::new(config.stream.buffer_capacity);
    let metrics = Arc::new(IngestMetrics::new());
    let geolocator = load_geolocator(config.geo.dataset_path.as_deref().map(Path::new));

    // Bind failures are fatal: nothing is served unless both sockets are up.
    let ingest = IngestListener::bind(
        IngestConfig {
            bind_addr: resolve(&config.udp_addr()).await?,
            sample_rate: config.ingest.sample_rate,
            max_datagram_size: config.ingest.max_datagram_size,
        },
        hub.clone(),
        geolocator,
        metrics.clone(),
    )
    .await?;

    let http_listener = tokio::net::TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", config.http_addr()))?;

    let state = AppState {
        hub: hub.clone(),
        metrics,
        shutdown: shutdown.clone(),
        stream_url: config.stream_url(),
        keep_alive: Some(Duration::from_secs(config.stream.keep_alive_secs)).filter(|d| !d.is_zero()),
    };
    let app = create_app(state, Path::new(&config.server.static_dir));

    let ingest_handle = tokio::spawn(ingest.run(shutdown.clone()));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("❌ Failed to listen for shutdown signal: {}", e);
                return;
            }
            info!("👋 Shutting down gracefully");
            shutdown.cancel();
        });
    }

    info!("✅ All services started successfully");
    info!("🗺️  Stream available at {}", config.stream_url());
    info!("⌨️  Press Ctrl+C to stop");

    let server_shutdown = shutdown.clone();
    axum::serve(
        http_listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
    .await
    .context("HTTP server error")?;

    shutdown.cancel();
    ingest_handle.await??;

    info!("Remaining subscribers at exit: {}", hub.subscriber_count());
    Ok(())
}

async fn resolve(addr: &str) -> Result<SocketAddr> {
    tokio::net::lookup_host(addr)
        .await
        .with_context(|| format!("failed to resolve {addr}"))?
        .next()
        .with_context(|| format!("no address found for {addr}"))
}
