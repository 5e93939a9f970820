//! Modgate gateway server binary
//!
//! Every generated reply is routed through the moderation engine before it
//! reaches the caller; rules are mutable at runtime through the admin API
//! with no restart.

use anyhow::Result;
use clap::Parser;
use modgate_detectors::DetectorSet;
use modgate_engine::ModerationEngine;
use modgate_rules::{MemoryRuleStore, RuleStore, SnapshotCache};
use modgate_server::routes::AppState;
use modgate_server::{seed, MockGenerator, ServerConfig};
use modgate_telemetry::{AuditReader, ChannelAuditSink};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "modgate-server")]
#[command(about = "Modgate moderation gateway", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("Starting Modgate gateway");

    let mut config = ServerConfig::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let metrics_handle = modgate_telemetry::metrics::install_recorder()?;

    let store = Arc::new(MemoryRuleStore::new());
    if config.seed_rules && store.is_empty() {
        let count = seed::seed_rules(&store)?;
        info!(rules = count, "seeded default rule set");
    }

    let cache = Arc::new(SnapshotCache::new(
        store.clone() as Arc<dyn RuleStore>,
        Duration::from_millis(config.refresh_interval_ms),
    ));
    let snapshot = cache.refresh_now().await?;
    info!(rules = snapshot.len(), "initial rule snapshot loaded");

    let detectors = DetectorSet::standard()?;
    let (audit_sink, audit_writer) =
        ChannelAuditSink::spawn(config.audit.clone(), config.audit_queue_capacity)?;
    let engine = Arc::new(ModerationEngine::new(
        cache,
        detectors,
        Arc::new(audit_sink),
        config.engine.clone(),
    ));

    let state = AppState {
        engine,
        store,
        generator: Arc::new(MockGenerator::new(config.generator.mode)),
        audit_reader: Arc::new(AuditReader::new(config.audit.audit_dir.clone())),
        metrics: metrics_handle,
    };

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let app = modgate_server::create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("gateway listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it the engine's audit sink) is gone; wait for
    // the writer to drain and flush the tail of the audit log.
    let _ = audit_writer.await;
    info!("server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("shutdown signal received, stopping server");
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("modgate=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("modgate=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
