use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bundlekit_api::config::ServerConfig;
use bundlekit_api::router::build_app_router;
use bundlekit_api::state::AppState;
use bundlekit_store::bulk::BulkExecutor;
use bundlekit_store::bundle_store::BundleStore;
use bundlekit_store::combination_store::CombinationStore;
use bundlekit_store::graphql::AdminApiStore;
use bundlekit_store::sync::Synchronizer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bundlekit_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        shop = %config.shop_domain,
        "Loaded server configuration",
    );

    // --- Remote stores ---
    // One admin-API client serves all three remote roles (records, media,
    // snapshot); the stores share its connection pool.
    let remote = Arc::new(AdminApiStore::new(
        &config.shop_domain,
        &config.api_version,
        config.admin_token.clone(),
        config.cart_transform_id.clone(),
    ));

    let bundles = Arc::new(BundleStore::new(remote.clone()));
    let combinations = Arc::new(CombinationStore::new(
        remote.clone(),
        remote.clone(),
        config.poll_policy(),
    ));
    let bulk = Arc::new(BulkExecutor::new(bundles.clone()));
    let sync = Arc::new(Synchronizer::new(bundles.clone(), remote.clone()));

    // --- Schema bootstrap ---
    bundles
        .ensure_definition()
        .await
        .expect("Failed to register the bundle record definition");
    combinations
        .ensure_definition()
        .await
        .expect("Failed to register the combination record definition");
    tracing::info!("Record definitions registered");

    // --- App state ---
    let state = AppState {
        bundles,
        combinations,
        bulk,
        sync,
        config: Arc::new(config.clone()),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
