use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use picduel::{
    api,
    auth::AuthConfig,
    config::AppConfig,
    images::{ImageConfig, ImageGenerator, PlaceholderProvider},
    snapshot,
    state::AppState,
    store::MemoryStore,
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picduel=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PicDuel...");

    let config = AppConfig::from_env();
    let store = Arc::new(MemoryStore::new(&config.app_id));
    tracing::info!("Rooms live under {}", store.rooms_path());

    if let Some(path) = &config.snapshot_path {
        if let Err(e) = snapshot::restore(&store, path).await {
            tracing::error!("Could not restore snapshot, starting empty: {}", e);
        }
        snapshot::spawn_snapshot_saver(store.clone(), path.clone(), config.snapshot_interval);
    }

    let image_config = ImageConfig::from_env();
    let images: Arc<dyn ImageGenerator> = match image_config.build_generator() {
        Ok(generator) => {
            tracing::info!("Image generator ready: {}", generator.name());
            generator
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize image generator: {}. Using placeholder images.",
                e
            );
            Arc::new(PlaceholderProvider)
        }
    };

    let state = Arc::new(AppState::new(
        store.clone(),
        images,
        image_config.timeout,
    ));

    // Export/import reveal every prompt, so they need operator credentials
    let auth_config = Arc::new(AuthConfig::from_env());

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api::routes(auth_config))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    if let Some(path) = &config.snapshot_path {
        match snapshot::save(&store, path).await {
            Ok(()) => tracing::info!("Saved rooms to {}", path.display()),
            Err(e) => tracing::error!("Final snapshot save failed: {}", e),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
