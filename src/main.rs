//! Resource router server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::request ──▶ routing::Router
//!                     (axum, layers)   (context chain,     │ best match,
//!                                       Request)           │ router frame
//!                                                          ▼
//!                                                   resources::Collection
//!                                                   (MemoryCollection per mount)
//!     Client Response                                      │
//!     ◀────────────── http::response ◀──────────────────────┘
//!                     (status, ETag, advice headers)
//!
//!     Cross-cutting: config, observability (tracing + Prometheus), lifecycle
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use resource_router::config::{load_config, ServerConfig};
use resource_router::lifecycle::{shutdown_signal, Shutdown};
use resource_router::observability::{logging, metrics};
use resource_router::resources::{Collection, MemoryCollection};
use resource_router::{HttpServer, Router};

#[derive(Parser)]
#[command(name = "resource-router")]
#[command(about = "Serve in-memory resource collections over HTTP", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn build_router(config: &ServerConfig) -> Result<Router, Box<dyn std::error::Error>> {
    let router = Router::new();
    for mount in &config.mounts {
        let id = router.add_route(
            mount.mode,
            &mount.pattern,
            Collection::new(MemoryCollection::new(mount.collection.clone())),
        )?;
        tracing::info!(
            route = %id,
            pattern = %mount.pattern,
            mode = %mount.mode,
            collection = %mount.collection,
            "Mounted collection"
        );
    }
    Ok(router)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "resource-router starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        mounts = config.mounts.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = Arc::new(build_router(&config)?);
    let server = HttpServer::new(&config, router)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
