mod auth;
mod config;
mod db;
mod errors;
mod generation;
mod llm_client;
mod models;
mod persistence;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{AuthProvider, HostedAuth, LocalAuth};
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::llm_client::LlmClient;
use crate::persistence::{LocalPersistence, PgPersistence, Persistence};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobFlow API v{}", env!("CARGO_PKG_VERSION"));

    let persistence: Arc<dyn Persistence> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            Arc::new(PgPersistence::new(pool))
        }
        None => {
            info!("DATABASE_URL not set; storing data under {}", config.local_store_dir);
            Arc::new(LocalPersistence::new(&config.local_store_dir))
        }
    };

    let auth: Arc<dyn AuthProvider> = match &config.auth_url {
        Some(url) => Arc::new(HostedAuth::new(url, &config.auth_api_key)?),
        None => Arc::new(LocalAuth::new()),
    };
    info!("Auth provider: {}", auth.name());

    let mut llm = LlmClient::new(config.gemini_api_key.clone())?;
    if let Some(base_url) = &config.gemini_base_url {
        llm = llm.with_base_url(base_url);
    }
    if !llm.has_api_key() {
        warn!("GEMINI_API_KEY not set; AI features will answer 503");
    }

    let state = AppState::new(config.clone(), llm, auth, persistence);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
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
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
