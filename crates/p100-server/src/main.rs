use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use p100_api::middleware::require_admin_key;
use p100_api::state::{AppState, AppStateInner};
use p100_api::{artwork, browse, characters, moderation, players, storage_admin, submissions};

/// Placeholder admin keys that MUST NOT be used.
const PLACEHOLDER_KEYS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "p100=debug,p100_api=debug,p100_db=info,tower_http=debug".into()),
        )
        .init();

    // Config
    let admin_key = std::env::var("P100_ADMIN_KEY").unwrap_or_default();
    if admin_key.is_empty() || PLACEHOLDER_KEYS.contains(&admin_key.as_str()) {
        eprintln!("FATAL: P100_ADMIN_KEY is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("P100_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("P100_PORT")
        .unwrap_or_else(|_| "4000".into())
        .parse()?;
    let db_path = std::env::var("P100_DB_PATH").unwrap_or_else(|_| "p100.db".into());
    let storage_dir: PathBuf = std::env::var("P100_STORAGE_DIR")
        .unwrap_or_else(|_| "./object-storage".into())
        .into();
    let public_base = std::env::var("P100_PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://{}:{}", host, port));

    // Init database and object store
    let db = p100_db::Database::open(&PathBuf::from(&db_path))?;
    let store = p100_storage::Store::new(storage_dir).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        store,
        public_base,
    });

    // Routes
    let public_routes = Router::new()
        .route("/health", get(browse::health))
        .route("/characters", get(browse::list_characters))
        .route("/characters/{id}", get(browse::get_character))
        .route("/characters/{id}/players", get(browse::get_players))
        .route("/characters/{id}/artworks", get(browse::get_artworks))
        .route(
            "/storage/v1/object/public/{bucket}/{*path}",
            get(browse::serve_object),
        )
        .route("/submissions", post(submissions::submit));

    let admin_routes = Router::new()
        .route("/admin/submissions", get(moderation::list_submissions))
        .route(
            "/admin/submissions/{id}/approve",
            post(moderation::approve_submission),
        )
        .route(
            "/admin/submissions/{id}/reject",
            post(moderation::reject_submission),
        )
        .route("/admin/submissions/bulk", post(moderation::bulk_review))
        .route("/admin/characters", post(characters::create_character))
        .route(
            "/admin/characters/{id}",
            put(characters::update_character).delete(characters::delete_character),
        )
        .route(
            "/admin/characters/{id}/artworks",
            put(artwork::set_character_artworks),
        )
        .route("/admin/players", post(players::create_player))
        .route(
            "/admin/players/update-priority",
            post(players::update_priority),
        )
        .route(
            "/admin/players/{id}",
            put(players::update_player).delete(players::delete_player),
        )
        .route(
            "/admin/artists",
            get(artwork::list_artists).post(artwork::create_artist),
        )
        .route(
            "/admin/artists/{id}",
            put(artwork::update_artist).delete(artwork::delete_artist),
        )
        .route("/admin/artworks", post(artwork::create_artwork))
        .route("/admin/artworks/{id}", delete(artwork::delete_artwork))
        .route(
            "/admin/blacklist",
            get(moderation::list_blacklist).post(moderation::add_blacklist),
        )
        .route(
            "/admin/blacklist/{username}",
            delete(moderation::remove_blacklist),
        )
        .route("/admin/storage/{bucket}", get(storage_admin::list_objects))
        .route(
            "/admin/storage/{bucket}/upload",
            post(storage_admin::upload_object),
        )
        .route(
            "/admin/storage/{bucket}/rename",
            post(storage_admin::rename_object),
        )
        .route(
            "/admin/storage/{bucket}/delete",
            post(storage_admin::delete_object),
        )
        .layer(middleware::from_fn(require_admin_key));

    let app = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        // Screenshots arrive base64-in-JSON; leave headroom over the 20 MiB
        // admin upload cap
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("P100 tracker listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
