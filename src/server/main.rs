//! HTTP server for proximity lookups.
//!
//! Exposes coordinate and address lookups as JSON so any front end can
//! forward the rendered chunks to its users.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nearby::config::Config;
use nearby::geocoding::OneMapGeocoder;
use nearby::{catalog, Coordinate, LookupOutcome, MessageFormatter, NearbyError, NearbyService};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Nearby places lookup server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Application state shared across handlers
struct AppState {
    service: NearbyService,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;

    info!("Nearby Lookup Server");

    let gateway = catalog::connect(&config.catalog).await?;
    let geocoder = OneMapGeocoder::new(
        &config.geocoder.base_url,
        Duration::from_secs(config.geocoder.timeout_secs),
    )?;
    let service = NearbyService::new(
        gateway,
        Arc::new(geocoder),
        MessageFormatter::new(config.formatter.max_chunk_size),
    )
    .with_postal_code_prefix(config.geocoder.postal_code_prefix.clone());

    let state = Arc::new(AppState { service });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/nearby", get(nearby_handler))
        .route("/v1/nearby/address", get(address_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Deserialize)]
struct NearbyQueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct AddressQueryParams {
    /// Free-text address or six-digit postal code
    text: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct LookupResponse {
    outcome: &'static str,
    chunks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_address: Option<String>,
}

impl LookupResponse {
    fn new(outcome: LookupOutcome, resolved_address: Option<String>) -> Self {
        let (outcome, chunks) = match outcome {
            LookupOutcome::Found(message) => ("found", message.into_chunks()),
            LookupOutcome::NoResults => ("no_results", Vec::new()),
            LookupOutcome::NoAddressMatch => ("no_address_match", Vec::new()),
        };
        Self {
            outcome,
            chunks,
            resolved_address,
        }
    }
}

fn error_response(e: NearbyError) -> (StatusCode, String) {
    let status = match e {
        NearbyError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        NearbyError::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        NearbyError::GeocodingFailure(_) => StatusCode::BAD_GATEWAY,
    };
    if status != StatusCode::BAD_REQUEST {
        tracing::error!("Lookup failed: {}", e);
    }
    (status, e.to_string())
}

/// Lookup around a coordinate
async fn nearby_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyQueryParams>,
) -> Result<Json<LookupResponse>, (StatusCode, String)> {
    let coordinate = Coordinate::new(params.lat, params.lon).map_err(error_response)?;

    let outcome = state
        .service
        .lookup_by_coordinate(coordinate)
        .await
        .map_err(error_response)?;

    Ok(Json(LookupResponse::new(outcome, None)))
}

/// Lookup around a geocoded address
async fn address_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AddressQueryParams>,
) -> Result<Json<LookupResponse>, (StatusCode, String)> {
    let lookup = state
        .service
        .lookup_by_address_text(&params.text)
        .await
        .map_err(error_response)?;

    Ok(Json(LookupResponse::new(
        lookup.outcome,
        lookup.resolved.map(|c| c.formatted_address),
    )))
}
