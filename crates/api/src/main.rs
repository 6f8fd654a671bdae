use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use demoforge_api::config::ServerConfig;
use demoforge_api::router::build_app_router;
use demoforge_api::sessions::SessionManager;
use demoforge_api::state::AppState;
use demoforge_provider::http::HttpGenerationProvider;
use demoforge_provider::orchestrator::{OrchestratorConfig, TaskOrchestrator};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demoforge_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // One provider client and one orchestrator for the whole process;
    // sessions share them.
    let provider = Arc::new(HttpGenerationProvider::new(config.provider.clone()));
    let orchestrator = Arc::new(TaskOrchestrator::new(
        provider,
        OrchestratorConfig {
            artifact_ttl: chrono::Duration::hours(config.artifact_ttl_hours),
            ..Default::default()
        },
    ));
    tracing::info!(api_url = %config.provider.api_url, "Generation orchestrator ready");

    let state = AppState {
        config: Arc::new(config.clone()),
        sessions: Arc::new(SessionManager::new()),
        orchestrator,
    };
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Resolve when SIGINT (Ctrl-C) or, on Unix, SIGTERM arrives.
async fn shutdown_signal() {
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
        result = tokio::signal::ctrl_c() => {
            result.expect("Failed to install Ctrl-C handler");
            tracing::info!("Received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
