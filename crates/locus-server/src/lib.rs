//! Locus HTTP service
//!
//! Exposes `VenueResolver::classify` as `POST /classify` for browser and
//! mobile clients.

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        Method,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use locus_client::VenueResolver;
use locus_core::{grid::cache_key, GeoPoint, VenueClassification};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

pub mod config;
pub mod error;

use error::AppError;

pub const CLASSIFY_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(Clone)]
pub struct AppState {
    pub resolver: VenueResolver,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub grid_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub venue: Option<VenueClassification>,
}

pub fn app(resolver: VenueResolver) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/classify", post(classify_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(AppState { resolver })
}

async fn classify_handler(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;
    let point = GeoPoint::new(request.lat, request.lng)?;

    if let Some(client_key) = request.grid_key.as_deref() {
        let key = cache_key(point);
        if client_key != key.as_str() {
            debug!(client_key, grid_key = %key, "Client grid key differs, using server key");
        }
    }

    let venue = state.resolver.classify(point).await;
    Ok((
        [(CACHE_CONTROL, CLASSIFY_CACHE_CONTROL)],
        Json(ClassifyResponse { venue }),
    ))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
