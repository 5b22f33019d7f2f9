//! Geocoding proxy
//!
//! Forwards forward/reverse geocoding requests to the mapping provider
//! with the API key injected server-side, so the key never reaches the
//! browser.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Deserialize)]
pub struct ForwardQuery {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ReverseQuery {
    pub lat: f64,
    pub lng: f64,
}

/// Forward geocode: address text to coordinates.
pub async fn forward(
    State(state): State<AppState>,
    Query(query): Query<ForwardQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    if query.query.trim().is_empty() {
        return Err(ApiError::Validation("query must not be empty".to_string()));
    }
    proxy(&state, &[("address", query.query.as_str())]).await
}

/// Reverse geocode: coordinates to address text.
pub async fn reverse(
    State(state): State<AppState>,
    Query(query): Query<ReverseQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let latlng = format!("{},{}", query.lat, query.lng);
    proxy(&state, &[("latlng", latlng.as_str())]).await
}

async fn proxy(state: &AppState, params: &[(&str, &str)]) -> ApiResult<Json<serde_json::Value>> {
    let key = &state.config.geocoding_api_key;
    if key.is_empty() {
        return Err(ApiError::Upstream("Geocoding not configured".to_string()));
    }

    let response = state
        .http_client
        .get(GEOCODE_URL)
        .query(params)
        .query(&[("key", key.as_str())])
        .send()
        .await
        .map_err(|e| ApiError::Upstream(format!("Geocoding request failed: {}", e)))?
        .error_for_status()
        .map_err(|e| ApiError::Upstream(format!("Geocoding provider error: {}", e)))?;

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| ApiError::Upstream(format!("Invalid geocoding response: {}", e)))?;

    Ok(Json(body))
}
