use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

use kladde_db::{create_pool, run_migrations, PgSnippetStore, PgUserStore};
use kladde_server::config::load_config;
use kladde_server::state::AppState;
use kladde_server::templates::TemplateCache;
use kladde_server::web::build_router;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting kladde server");

    // Load configuration
    let config_path = std::env::var("KLADDE_CONFIG").unwrap_or_else(|_| "kladde.yaml".to_string());
    tracing::info!("Loading config from: {}", config_path);
    let config = load_config(&config_path)?;

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.db.url)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Parse every page template up front; a broken template must never
    // reach request time.
    let templates = TemplateCache::new().context("Failed to build template cache")?;

    // Server-side session persistence next to the application tables
    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .context("Failed to migrate session store")?;
    let sessions = SessionManagerLayer::new(session_store)
        .with_secure(config.session.secure)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            config.session.lifetime_hours as i64,
        )));

    // Build application state
    let state = AppState::new(
        Arc::new(PgSnippetStore::new(pool.clone())),
        Arc::new(PgUserStore::new(pool)),
        templates,
        config.clone(),
    );

    // Build router
    let app = build_router(state, sessions);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;

    tracing::info!("Server listening on {}", config.listen);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
}
