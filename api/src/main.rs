use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rand::rngs::OsRng;
use rand::TryRngCore;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use webcam_dice_common::config::Config;
use webcam_dice_common::seed::{SeedResponse, SEED_PATH};

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

struct AppState {
    allowed_origin: HeaderValue,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("invalid allowed origin {0:?}")]
    InvalidOrigin(String),
    #[error("OS entropy source failed: {0}")]
    Entropy(String),
}

// ---------------------------------------------------------------------------
// Seed generation
// ---------------------------------------------------------------------------

/// Four bytes from the OS CSPRNG, read little-endian.
fn generate_seed() -> Result<SeedResponse, ApiError> {
    let mut bytes = [0u8; 4];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| ApiError::Entropy(e.to_string()))?;
    Ok(SeedResponse::from_le_bytes(bytes))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /random-seed
async fn random_seed() -> Response {
    info!(path = SEED_PATH, "received seed request");
    match generate_seed() {
        Ok(body) => {
            info!(seed = body.seed, "generated seed");
            Json(body).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to generate seed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Reject browser requests whose `Origin` is not the configured one.
/// Requests without an `Origin` header are not cross-origin and pass through.
async fn reject_foreign_origin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if origin != &state.allowed_origin {
            warn!(origin = ?origin, "rejecting request from foreign origin");
            return StatusCode::FORBIDDEN.into_response();
        }
    }
    next.run(request).await
}

fn router(allowed_origin: &str) -> Result<Router, ApiError> {
    let allowed_origin = HeaderValue::from_str(allowed_origin)
        .map_err(|_| ApiError::InvalidOrigin(allowed_origin.to_string()))?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([allowed_origin.clone()]))
        .allow_methods([Method::GET]);

    let state = Arc::new(AppState { allowed_origin });

    Ok(Router::new()
        .route(SEED_PATH, get(random_seed))
        .layer(middleware::from_fn_with_state(state, reject_foreign_origin))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let app = match router(&config.server.allowed_origin) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to build router");
            std::process::exit(1);
        }
    };

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    info!(
        addr,
        allowed_origin = config.server.allowed_origin,
        "seed server starting"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind to {addr}: {e}");
        std::process::exit(1);
    });
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
}
