use std::sync::Arc;

use anyhow::Context;
use calflow_engine::{Engine, StepEngine};
use tracing_subscriber::EnvFilter;

use calflow_server::auth::IdentityClient;
use calflow_server::config::{AppConfig, DatabaseConfig};
use calflow_server::db;
use calflow_server::orchestrator::ExecutionOrchestrator;
use calflow_server::routes::build_router;
use calflow_server::source_cache::{HttpFetcher, SourceCache};
use calflow_server::store::PgStore;
use calflow_server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // Configuration errors are fatal: the process refuses to start on a
    // missing or unparseable value rather than limping with defaults.
    let config = AppConfig::from_env().context("loading application configuration")?;
    let db_config = DatabaseConfig::from_env().context("loading database configuration")?;

    let pool = db::create_pool(&db_config)
        .await
        .context("connecting to postgres")?;
    db::ensure_schema(&pool).await.context("preparing schema")?;
    tracing::info!("database ready");

    let store = Arc::new(PgStore::new(pool));
    let cache = Arc::new(SourceCache::new(Arc::new(HttpFetcher::new())));
    let engine: Arc<dyn Engine> = Arc::new(StepEngine::default());
    let verifier = Arc::new(IdentityClient::new(
        config.identity_base_url.clone(),
        config.identity_api_key.clone(),
    ));

    let orchestrator = Arc::new(ExecutionOrchestrator::new(
        store.clone(),
        store.clone(),
        cache,
        engine,
    ));
    let state = AppState::new(orchestrator, store.clone(), store, verifier);

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    tracing::info!("shut down cleanly");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,calflow_server=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c"),
        _ = terminate => tracing::info!("received terminate signal"),
    }
}
