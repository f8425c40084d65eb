//! # triage-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Triage clinical backend.
//! Binds to a configurable port (default 8080).

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = triage_api::bootstrap::load_config();
    let tokens = triage_api::bootstrap::load_token_service();

    // External collaborators: both optional, both env-driven.
    let object_store = triage_api::bootstrap::load_object_store().map_err(|e| {
        tracing::error!("Object store initialization failed: {e}");
        e
    })?;
    let db_pool = triage_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let port = config.port;
    let state = triage_api::bootstrap::bootstrap(config, tokens, object_store, db_pool);

    // Hydrate in-memory stores from the database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = triage_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Triage API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
