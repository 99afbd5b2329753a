//! HTTP query endpoint
//!
//! `GET /query?lat=<lat>&lng=<lng>` answers with the attribute data of the most
//! specific fence containing the point, or `{"name":"unknown"}`.

use crate::AppState;
use crate::error::{Result, ServerError};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Raw query string parameters, parsed by hand so errors carry the parser message
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    lat: Option<String>,
    lng: Option<String>,
}

fn parse_param(name: &str, value: Option<&str>) -> Result<f64> {
    let value = value.ok_or_else(|| ServerError::bad_request(format!("missing parameter {name}")))?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| ServerError::bad_request(format!("invalid {name} {value:?}: {e}")))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/query", get(query)).with_state(state)
}

async fn query(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<BTreeMap<String, String>>> {
    let Query(params) = params.map_err(|e| ServerError::bad_request(e.body_text()))?;
    let lat = parse_param("lat", params.lat.as_deref())?;
    let lng = parse_param("lng", params.lng.as_deref())?;

    let fences = state.resolver.resolve(lat, lng)?;
    let body = match fences.first() {
        Some(fence) => fence.data().clone(),
        None => BTreeMap::from([("name".to_string(), "unknown".to_string())]),
    };
    Ok(Json(body))
}
