use rusqlite::Connection;
use sitemirror_server::{
    config::Config,
    handlers::{AdminState, admin_routes},
    mirror::SiteMirror,
};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitemirror_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting sitemirror v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {:?}", config.database_path);
    if config.snapshot.enabled {
        info!(
            "Snapshots: {:?} (debounce {:?})",
            config.snapshot.dir, config.snapshot.debounce
        );
    } else {
        info!("Snapshots disabled");
    }
    if config.git.enabled {
        info!(
            "Git sync: branch {} in {:?}",
            config.git.branch, config.git.workdir
        );
        if !config.git.is_api_configured() {
            warn!("Git sync API fallback not configured (needs a token and GITHUB_REPOSITORY)");
        }
    } else {
        info!("Git sync disabled");
    }

    let conn = match Connection::open(&config.database_path) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let mirror = Arc::new(SiteMirror::new(config.clone(), conn));
    let report = mirror.repo().ready().await;
    if !report.is_complete() {
        warn!(
            "Schema initialization finished with {} failed statements",
            report.failed.len()
        );
    }

    let app = admin_routes(AdminState {
        mirror: mirror.clone(),
    })
    .layer(TraceLayer::new_for_http());

    let addr = config.server_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server listening on http://{}", addr);

    // Run server with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    // Don't drop a snapshot that is still waiting on its debounce window.
    mirror.shutdown().await;
    info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}
