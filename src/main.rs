use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tillsync::{create_router, ManualConnectivity, OfflineConfig, OfflineContext};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tillsync")]
#[command(about = "Tillsync - offline action queue for the POS till", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 6760)]
    port: u16,

    /// Data directory path (in-memory storage when omitted)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Endpoint that receives replayed action batches
    #[arg(long)]
    remote_url: Option<String>,

    /// Start in offline mode
    #[arg(long)]
    offline: bool,

    /// Seconds between cache expiry sweeps
    #[arg(long)]
    sweep_interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tillsync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = OfflineConfig::load(&std::env::current_dir()?);
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(url) = args.remote_url {
        config.remote_url = Some(url);
    }
    if args.offline {
        config.start_online = false;
    }
    if let Some(secs) = args.sweep_interval_secs {
        config.set_sweep_interval(Duration::from_secs(secs));
    }

    let connectivity = Arc::new(ManualConnectivity::new(config.start_online));
    let ctx = OfflineContext::open(config)?;
    tracing::info!(
        "Offline store ready ({} pending actions)",
        ctx.pending_actions_count()
    );

    let monitor = ctx.start_monitor(connectivity.clone());

    let (sweeper_shutdown, sweeper_rx) = watch::channel(false);
    let sweeper = Arc::new(ctx.sweeper());
    let sweeper_task = tokio::spawn(sweeper.start(sweeper_rx));

    let app = create_router(ctx.clone(), connectivity);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, stopping background tasks...");
    monitor.shutdown().await;
    let _ = sweeper_shutdown.send(true);
    if let Err(e) = sweeper_task.await {
        tracing::warn!("Cache sweeper exited abnormally: {}", e);
    }
    tracing::info!(
        "Shutdown complete ({} actions still pending)",
        ctx.pending_actions_count()
    );

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
