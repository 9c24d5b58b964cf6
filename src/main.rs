use std::net::SocketAddr;

use playground_gateway::config::Settings;
use playground_gateway::{connect_store, spawn_cleanup_coordinator, CleanupSchedule};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file from project root
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;

    init_logging(&settings);

    tracing::info!("Starting playground gateway v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!("Connecting to demo store: {}", settings.store.demo_addr);
    let demo = connect_store(&settings, &settings.store.demo_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Demo store connection failed: {}", e))?;

    tracing::info!("Connecting to admin store: {}", settings.store.admin_addr);
    let admin = connect_store(&settings, &settings.store.admin_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Admin store connection failed: {}", e))?;

    let shutdown_token = CancellationToken::new();

    let cleanup_handle = if settings.cleanup.enabled {
        let schedule = CleanupSchedule::new(
            settings.cleanup.last_cleanup_key(),
            settings.cleanup.interval(),
        );
        let handle =
            spawn_cleanup_coordinator(demo.clone(), admin.clone(), schedule, shutdown_token.clone());
        tracing::info!("Background cleanup coordinator started");
        Some(handle)
    } else {
        tracing::warn!("Cleanup coordinator disabled, demo store will not be flushed");
        None
    };

    let app = playground_gateway::create_router(demo, admin, &settings);

    let addr: SocketAddr = settings.server.address().parse()?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Playground gateway is ready to accept connections");
    tracing::info!("Commands available at http://{}/shell/exec/{{command}}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    // serve can also return without a signal; make sure the coordinator stops
    shutdown_token.cancel();
    if let Some(handle) = cleanup_handle {
        if let Err(e) = handle.await {
            tracing::error!("Cleanup coordinator task failed: {}", e);
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_logging(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if settings.logging.format == "json" {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
    cancel_token.cancel();
}
