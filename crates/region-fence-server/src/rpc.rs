//! RPC endpoint returning the ISO code of the region containing a point
//!
//! Requests and replies are JSON messages posted to `/RegionAGogo/GetRegion`.

use crate::AppState;
use crate::error::{Result, ServerError};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Attribute holding the region code
pub const CODE_ATTRIBUTE: &str = "iso";

/// Code returned when no fence matches
pub const UNKNOWN_CODE: &str = "unknown";

/// Missing coordinates default to 0, like unset proto3 fields
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Point {
    pub latitude: f32,
    pub longitude: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionResponse {
    pub code: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/RegionAGogo/GetRegion", post(get_region))
        .with_state(state)
}

async fn get_region(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Point>, JsonRejection>,
) -> Result<Json<RegionResponse>> {
    let Json(point) = payload.map_err(|e| ServerError::bad_request(e.body_text()))?;

    let code = state.resolver.primary_code(
        f64::from(point.latitude),
        f64::from(point.longitude),
        CODE_ATTRIBUTE,
    )?;

    Ok(Json(RegionResponse {
        code: code.unwrap_or(UNKNOWN_CODE).to_string(),
    }))
}
