//! HTTP boundary.
//!
//! Thin transport wrappers over the core:
//!   - `GET /health`
//!   - `GET /predict?co&o3&no2&pm25&lat&lng` via the configured predictor
//!   - `GET /nearest-city?lat&lng` via the locator
//!   - `GET /subindex?pollutant&concentration` via interpolator + classifier
//!
//! Missing or malformed query parameters are rejected with 400 by the
//! extractor before a handler runs.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::breakpoints::to_subindex;
use crate::category::classify;
use crate::dataset::ReferencePointSet;
use crate::locate::LocateError;
use crate::logging::{self, DataSource};
use crate::model::{Coordinate, Pollutant};
use crate::predict::{CategoryPredictor, FeatureVector, PredictError};

// ---------------------------------------------------------------------------
// State and errors
// ---------------------------------------------------------------------------

/// Shared, read-only request state.
#[derive(Clone)]
pub struct AppState {
    pub points: Arc<ReferencePointSet>,
    pub predictor: Arc<dyn CategoryPredictor>,
}

impl AppState {
    pub fn new(points: ReferencePointSet, predictor: Arc<dyn CategoryPredictor>) -> Self {
        Self {
            points: Arc::new(points),
            predictor,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(d) => (StatusCode::BAD_REQUEST, d),
            ApiError::Unavailable(d) => (StatusCode::SERVICE_UNAVAILABLE, d),
        };
        (status, Json(serde_json::json!({ "error": detail }))).into_response()
    }
}

impl From<LocateError> for ApiError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::EmptyReferenceSet => ApiError::Unavailable("Dataset not available".to_string()),
            LocateError::InvalidCoordinate => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::InvalidFeature { .. } => ApiError::BadRequest(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NearestCityResponse {
    pub city: String,
    pub country: String,
    pub aqi_value: Option<u16>,
    /// Category label as recorded in the dataset.
    pub aqi_category: String,
    pub distance_km: f64,
}

#[derive(Debug, Deserialize)]
pub struct SubIndexQuery {
    pub pollutant: String,
    pub concentration: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubIndexResponse {
    pub pollutant: String,
    pub unit: String,
    pub concentration: Option<f64>,
    pub subindex: Option<u16>,
    pub category: String,
    pub color: String,
    pub advisory: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", get(predict))
        .route("/nearest-city", get(nearest_city))
        .route("/subindex", get(subindex))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `bind` and serves until the process is stopped.
pub async fn serve(state: AppState, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    logging::info(
        DataSource::Api,
        None,
        &format!(
            "listening on http://{} ({} reference points, predictor {})",
            listener.local_addr()?,
            state.points.len(),
            state.predictor.name()
        ),
    );
    axum::serve(listener, router(state)).await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn predict(
    State(state): State<AppState>,
    Query(features): Query<FeatureVector>,
) -> Result<Json<PredictResponse>, ApiError> {
    let category = state.predictor.predict(&features).map_err(|e| {
        logging::warn(DataSource::Predictor, Some(state.predictor.name()), &e.to_string());
        ApiError::from(e)
    })?;
    Ok(Json(PredictResponse { category }))
}

async fn nearest_city(
    State(state): State<AppState>,
    Query(query): Query<NearestQuery>,
) -> Result<Json<NearestCityResponse>, ApiError> {
    let at = Coordinate::new(query.lat, query.lng);
    if !at.is_valid() {
        return Err(ApiError::BadRequest(format!(
            "coordinate out of range: lat must be in [-90, 90], lng in [-180, 180], got {}",
            at
        )));
    }

    let found = state.points.nearest(at).map_err(|e| {
        if e == LocateError::EmptyReferenceSet {
            logging::error(DataSource::Api, Some("/nearest-city"), "no reference points loaded");
        }
        ApiError::from(e)
    })?;

    Ok(Json(NearestCityResponse {
        city: found.point.city.clone(),
        country: found.point.country.clone(),
        aqi_value: found.point.aqi_value,
        aqi_category: found.point.category_label.clone(),
        distance_km: found.distance_km,
    }))
}

async fn subindex(Query(query): Query<SubIndexQuery>) -> Result<Json<SubIndexResponse>, ApiError> {
    let kind: Pollutant = query
        .pollutant
        .parse()
        .map_err(|e: crate::model::UnknownPollutant| ApiError::BadRequest(e.to_string()))?;

    let subindex = to_subindex(query.concentration, kind);
    let category = classify(subindex);

    Ok(Json(SubIndexResponse {
        pollutant: kind.code().to_string(),
        unit: kind.unit().to_string(),
        concentration: query.concentration,
        subindex,
        category: category.label().to_string(),
        color: category.color().to_string(),
        advisory: category.advisory().to_string(),
    }))
}
