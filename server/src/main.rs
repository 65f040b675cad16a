use actomaps_server::config::Config;
use actomaps_server::layer::{LayerAppState, LayerService, PgLayerStore, admin_routes, layer_routes};
use actomaps_server::ratelimit::{RateLimiter, rate_limit};
use actomaps_server::response::ErrorResponse;
use actomaps_server::storage::LocalObjectStore;
use axum::{Json, Router, extract::State, middleware, response::IntoResponse, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Ensure a directory exists, creating it if necessary.
/// Returns true if directory exists and is empty.
fn ensure_directory(path: &Path, name: &str) -> std::io::Result<bool> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created {} directory: {:?}", name, path);
        Ok(true) // newly created, so empty
    } else if path.is_dir() {
        let is_empty = path.read_dir()?.next().is_none();
        Ok(is_empty)
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} path {:?} exists but is not a directory", name, path),
        ))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
    uptime_seconds: u64,
}

async fn health(
    State(state): State<LayerAppState>,
) -> (axum::http::StatusCode, Json<HealthResponse>) {
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    // Check whether the database is reachable by counting layers
    let db_ready = state.service.layer_count().await.is_ok();

    let status = if db_ready { "healthy" } else { "degraded" };
    let database = if db_ready { "ready" } else { "unavailable" };
    let http_status = if db_ready {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
            uptime_seconds: uptime,
        }),
    )
}

#[derive(Serialize)]
struct MetricsResponse {
    /// Server uptime in seconds
    uptime_seconds: u64,
    /// Server version
    version: &'static str,
    /// Number of persisted layers
    layer_count: i64,
}

async fn metrics(
    State(state): State<LayerAppState>,
) -> Result<Json<MetricsResponse>, ErrorResponse> {
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    let layer_count = state
        .service
        .layer_count()
        .await
        .map_err(ErrorResponse::from)?;

    Ok(Json(MetricsResponse {
        uptime_seconds: uptime,
        version: env!("CARGO_PKG_VERSION"),
        layer_count,
    }))
}

/// Prometheus metrics handle for exposing metrics in Prometheus format
static PROMETHEUS_HANDLE: std::sync::OnceLock<PrometheusHandle> = std::sync::OnceLock::new();

/// Initialize the Prometheus metrics recorder
fn setup_prometheus_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Endpoint to expose metrics in Prometheus format
async fn prometheus_metrics() -> impl IntoResponse {
    let handle = PROMETHEUS_HANDLE
        .get()
        .expect("Prometheus handle not initialized");
    handle.render()
}

/// Update gauge metrics (called periodically)
async fn update_gauge_metrics(state: &LayerAppState) {
    if let Ok(count) = state.service.layer_count().await {
        metrics::gauge!("actomaps_layers_total").set(count as f64);
    }

    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);
    metrics::gauge!("actomaps_uptime_seconds").set(uptime as f64);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Record server start time
    START_TIME.set(Instant::now()).ok();

    // Initialize Prometheus metrics recorder (must be done before any metrics are recorded)
    let prometheus_handle = setup_prometheus_metrics();
    PROMETHEUS_HANDLE.set(prometheus_handle).ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "actomaps=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: host={}, port={}",
        config.host, config.port
    );

    // Ensure the upload storage directory exists (auto-create for dev-friendly startup)
    match ensure_directory(&config.upload.storage_dir, "upload storage") {
        Ok(_) => {}
        Err(e) => {
            warn!(
                "Failed to create upload storage directory {:?}: {}",
                config.upload.storage_dir, e
            );
        }
    }

    // Connect to the PostGIS-enabled database
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.connect_timeout)
        .connect(&config.database.url)
        .await?;
    info!("Connected to database");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Migrations applied");
    }

    // Wire the store, object storage and service
    let store = Arc::new(PgLayerStore::new(pool));
    let objects = Arc::new(LocalObjectStore::new(config.upload.storage_dir.clone()));
    let service = Arc::new(LayerService::new(store, objects));

    let app_state = LayerAppState {
        service,
        upload: config.upload.clone(),
    };

    // One limiter per API tier
    let public_limiter = Arc::new(RateLimiter::new(
        config.rate_limit.public_per_window,
        config.rate_limit.window,
    ));
    let admin_limiter = Arc::new(RateLimiter::new(
        config.rate_limit.admin_per_window,
        config.rate_limit.window,
    ));

    // Periodic prune of stale rate-limit windows
    let prune_public = public_limiter.clone();
    let prune_admin = admin_limiter.clone();
    let prune_interval = config.rate_limit.window.max(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(prune_interval);
        loop {
            interval.tick().await;
            prune_public.prune();
            prune_admin.prune();
        }
    });

    // Periodic update of gauge metrics
    let metrics_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            update_gauge_metrics(&metrics_state).await;
        }
    });

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public and admin API routers, each behind its own rate-limit tier
    let public_api = layer_routes(app_state.clone()).layer(middleware::from_fn_with_state(
        public_limiter,
        rate_limit,
    ));
    let admin_api = admin_routes(app_state.clone()).layer(middleware::from_fn_with_state(
        admin_limiter,
        rate_limit,
    ));

    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/metrics/prometheus", get(prometheus_metrics))
        .with_state(app_state)
        .merge(Router::new().nest("/api", public_api))
        .merge(Router::new().nest("/api/admin", admin_api))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Add static file serving if configured (map viewer assets)
    let app = if let Some(ref static_dir) = config.static_files.dir {
        if static_dir.exists() {
            info!("Serving static files from: {:?}", static_dir);

            // ServeDir with SPA fallback: serve index.html for any unmatched routes
            let index_path = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_path));

            // Add compression layer for static files (gzip)
            let static_service = ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .service(serve_dir);

            app.fallback_service(static_service)
        } else {
            warn!(
                "Static files directory not found: {:?} - static file serving disabled",
                static_dir
            );
            app
        }
    } else {
        info!("Static file serving disabled (STATIC_FILES_DIR not set)");
        app
    };

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("ACTO Maps server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
