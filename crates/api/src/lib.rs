//! HTTP API server with observability for the journey booking system.
//!
//! Provides REST endpoints for booking multi-segment routes, cancelling
//! bookings and receiving payment provider webhooks, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use pricing::{CommissionCalculator, InsuranceCalculator};
use saga::{
    BookingSaga, CancellationToken, InMemoryPaymentGateway, InMemoryProviderGateway,
    PaymentProcessor, ProviderRegistry, ReconciliationHandler,
};
use store::{InMemoryBookingRepository, InMemoryRouteRepository};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Booking saga over the in-memory stores and gateways.
pub type Saga =
    BookingSaga<InMemoryBookingRepository, InMemoryRouteRepository, InMemoryPaymentGateway>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub saga: Saga,
    pub reconciliation: ReconciliationHandler<InMemoryBookingRepository>,
    pub routes: InMemoryRouteRepository,
    pub commission: CommissionCalculator,
    pub insurance: InsuranceCalculator,
    /// Tripped on server shutdown; in-flight sagas stop before their next segment.
    pub shutdown: CancellationToken,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/routes", post(routes::catalog::register))
        .route("/routes/{id}/quote", get(routes::catalog::quote))
        .route("/bookings", post(routes::bookings::create))
        .route("/bookings/{id}", get(routes::bookings::get))
        .route("/bookings/{id}/cancel", post(routes::bookings::cancel))
        .route("/webhooks/payment", post(routes::webhooks::payment))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state with in-memory stores and gateways.
///
/// Every configured operator gets its own in-memory provider gateway.
pub fn create_default_state(config: &Config) -> Arc<AppState> {
    let bookings = InMemoryBookingRepository::new();
    let routes = InMemoryRouteRepository::new();

    let mut providers = ProviderRegistry::new();
    for name in &config.providers {
        let gateway = InMemoryProviderGateway::new(name.to_uppercase());
        providers.register(name.clone(), Arc::new(gateway));
    }

    let commission = CommissionCalculator::new(config.commission_rates.clone());
    let insurance = InsuranceCalculator::new(config.insurance_rates.clone());
    let payments = PaymentProcessor::new(InMemoryPaymentGateway::new(), config.currency.clone());

    let saga = BookingSaga::new(bookings.clone(), routes.clone(), providers.clone(), payments)
        .with_commission(commission.clone())
        .with_insurance(insurance.clone());
    let reconciliation = ReconciliationHandler::new(bookings, providers);

    Arc::new(AppState {
        saga,
        reconciliation,
        routes,
        commission,
        insurance,
        shutdown: CancellationToken::new(),
    })
}
