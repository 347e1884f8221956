//! Priced route intake and quotes.
//!
//! Route search lives outside this service; it hands over priced routes that
//! bookings are then made against.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::RouteId;
use domain::Route;
use pricing::{PremiumBreakdown, RoutePricing};
use serde::Serialize;
use store::RouteRepository;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct RouteRegisteredResponse {
    pub route_id: String,
    pub segments: usize,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub route_id: String,
    pub from_city: Option<String>,
    pub to_city: Option<String>,
    pub pricing: RoutePricing,
    pub insurance: PremiumBreakdown,
    /// Grand total if insurance is included.
    pub insured_total: String,
}

/// POST /routes: stores a priced route for booking.
#[tracing::instrument(skip(state, route), fields(route_id = %route.id))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(route): Json<Route>,
) -> Result<(StatusCode, Json<RouteRegisteredResponse>), ApiError> {
    if route.id.is_blank() {
        return Err(ApiError::BadRequest("route id is required".to_string()));
    }
    if route.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "route {} has no segments",
            route.id
        )));
    }

    let response = RouteRegisteredResponse {
        route_id: route.id.to_string(),
        segments: route.segment_count(),
    };
    state.routes.insert(route).await;
    tracing::info!(segments = response.segments, "route registered");

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /routes/{id}/quote: commission and insurance pricing for a route.
#[tracing::instrument(skip(state))]
pub async fn quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let route_id = RouteId::new(id);
    let route = state
        .routes
        .find_by_id(&route_id)
        .await
        .map_err(saga::SagaError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("Route {route_id} not found")))?;

    let pricing = state.commission.route_pricing(&route);
    let insurance = state.insurance.quote(&route);
    let insured_total = (pricing.grand_total + insurance.premium).rounded();

    Ok(Json(QuoteResponse {
        route_id: route.id.to_string(),
        from_city: route.from_city().map(String::from),
        to_city: route.to_city().map(String::from),
        pricing,
        insurance,
        insured_total: insured_total.to_string(),
    }))
}
