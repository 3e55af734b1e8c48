use keystone_server::{app, auth::AppState, config::ServerConfig};
use keystone_token::{Authenticator, InMemoryDirectory, TokenManager};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(bind_address = %config.bind_address, "Loaded configuration");

    let directory = match &config.users_file {
        Some(path) => InMemoryDirectory::from_file(path)
            .await
            .expect("failed to load user directory"),
        None => {
            tracing::warn!("No users file configured, every login will fail");
            InMemoryDirectory::default()
        }
    };

    let tokens = TokenManager::new(config.jwt).expect("invalid token configuration");
    let state = Arc::new(AppState::new(
        tokens,
        Authenticator::new(Arc::new(directory)),
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
