use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crescendo_core::{
    load_config, validate_config, ArtistStore, CoordinationDb, CrawlRunner, PendingArtistQueue,
    PendingGenreMap, PrefixCatalog, RateLimiter, SearchApi, SearchSlotRegistry, SeedGenerator,
    SqliteArtistStore,
};

use crescendo_worker::api::create_router;
use crescendo_worker::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("CRESCENDO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Coordination store path: {:?}", config.store.path);
    info!("Artist database path: {:?}", config.database.path);

    // Log config hash so deployments can tell worker configs apart
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "Starting crescendo worker v{} (config {})",
        VERSION,
        &config_hash[..16]
    );

    // The coordination store is the one dependency that must be
    // reachable at startup; everything later degrades gracefully.
    let db = Arc::new(
        CoordinationDb::open(&config.store.path)
            .context("Failed to open coordination store")?,
    );
    info!("Coordination store opened");

    // Artist persistence
    let artist_store: Arc<dyn ArtistStore> = Arc::new(
        SqliteArtistStore::new(&config.database.path)
            .context("Failed to open artist database")?,
    );
    info!("Artist store initialized");

    // Coordination primitives, shared with every other worker process
    // through the store.
    let rate_limiter = Arc::new(RateLimiter::new(
        Arc::clone(&db),
        config.rate_limit.window_seconds,
        config.rate_limit.max_requests,
    ));
    let slots = Arc::new(SearchSlotRegistry::new(
        Arc::clone(&db),
        config.slots.max_concurrent,
        config.slots.lease_timeout_seconds as f64,
    ));
    let artist_queue = Arc::new(PendingArtistQueue::new(
        Arc::clone(&db),
        config.ingestion.batch_size,
    ));
    let genre_map = Arc::new(PendingGenreMap::new(
        Arc::clone(&db),
        config.ingestion.batch_size,
    ));

    // Create the crawl runner if enabled. It needs a search API
    // client; none is bundled with this binary yet, so an enabled
    // crawler is a configuration mistake. The status API and the
    // shared coordination primitives stay useful either way.
    let runner = if config.crawler.enabled {
        match search_api_client() {
            Some(search_api) => {
                let catalog = PrefixCatalog::load(&config.seeder.catalog_path);
                info!(prefixes = catalog.len(), "Prefix catalog loaded");
                let seeder = Arc::new(SeedGenerator::new(
                    catalog,
                    Arc::clone(&artist_store),
                    config.seeder.max_workers_hint(),
                ));

                let runner = Arc::new(CrawlRunner::new(
                    config.crawler.clone(),
                    config.ingestion.max_albums_per_artist,
                    seeder,
                    Arc::clone(&rate_limiter),
                    Arc::clone(&slots),
                    Arc::clone(&artist_queue),
                    Arc::clone(&genre_map),
                    Arc::clone(&artist_store),
                    search_api,
                ));
                runner.start();
                info!("Crawl runner started");
                Some(runner)
            }
            None => {
                warn!("Crawler enabled in config but no search backend is available in this build");
                None
            }
        }
    } else {
        info!("Crawler disabled in config");
        None
    };

    // Create app state
    let app_state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&db),
        rate_limiter,
        slots,
        artist_queue,
        genre_map,
        runner,
    ));

    // Create router
    let app = create_router(Arc::clone(&app_state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting status API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(runner) = app_state.runner() {
        info!("Stopping crawl runner...");
        runner.stop().await;
    }

    info!("Shutting down...");
    db.close();
    info!("Coordination store closed");

    Ok(())
}

/// Resolve the outbound search API client for this build.
///
/// Concrete HTTP clients live outside the core crate and none ships
/// with the worker yet.
fn search_api_client() -> Option<Arc<dyn SearchApi>> {
    None
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
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
}
