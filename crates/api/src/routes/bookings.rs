//! Booking create, read and cancel endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, FixedOffset, Utc};
use common::BookingId;
use domain::{BookedSegment, Booking, InsuranceCoverage, Payment};
use saga::BookingRequest;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::AppState;
use crate::error::ApiError;

const DEFAULT_CANCEL_REASON: &str = "cancelled by passenger";

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct CancelBookingRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub route_id: String,
    pub status: String,
    pub passenger: String,
    pub segments: Vec<SegmentResponse>,
    pub total_price: String,
    pub total_commission: String,
    pub insurance_premium: String,
    pub grand_total: String,
    pub insurance: Option<InsuranceCoverage>,
    pub payment: Option<PaymentResponse>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub compensation_failures: usize,
}

#[derive(Serialize)]
pub struct SegmentResponse {
    pub segment_id: String,
    pub provider: String,
    pub transport_type: String,
    pub from: String,
    pub to: String,
    pub departure: DateTime<FixedOffset>,
    pub arrival: DateTime<FixedOffset>,
    pub ticket_number: String,
    pub price: String,
    pub commission: String,
    pub total_price: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub status: String,
    pub amount: String,
    pub currency: String,
    pub method: String,
    pub provider_payment_id: Option<String>,
    pub failure_reason: Option<String>,
}

impl From<&BookedSegment> for SegmentResponse {
    fn from(segment: &BookedSegment) -> Self {
        Self {
            segment_id: segment.segment_id().to_string(),
            provider: segment.provider().to_string(),
            transport_type: segment.transport_type().to_string(),
            from: segment.origin().to_string(),
            to: segment.destination().to_string(),
            departure: segment.departure(),
            arrival: segment.arrival(),
            ticket_number: segment.ticket_number().to_string(),
            price: segment.price().to_string(),
            commission: segment.commission().to_string(),
            total_price: segment.total_price().to_string(),
            status: segment.status().as_str().to_string(),
        }
    }
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id().to_string(),
            status: payment.status().to_string(),
            amount: payment.amount().to_string(),
            currency: payment.currency().to_string(),
            method: payment.method().as_str().to_string(),
            provider_payment_id: payment.provider_payment_id().map(String::from),
            failure_reason: payment.failure_reason().map(String::from),
        }
    }
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id().to_string(),
            route_id: booking.route_id().to_string(),
            status: booking.status().to_string(),
            passenger: booking.passenger().full_name(),
            segments: booking.segments().iter().map(SegmentResponse::from).collect(),
            total_price: booking.total_price().to_string(),
            total_commission: booking.total_commission().to_string(),
            insurance_premium: booking.insurance_premium().to_string(),
            grand_total: booking.grand_total().to_string(),
            insurance: booking.insurance_coverage().copied(),
            payment: booking.payment().map(PaymentResponse::from),
            created_at: booking.created_at(),
            confirmed_at: booking.confirmed_at(),
            cancelled_at: booking.cancelled_at(),
            cancellation_reason: booking.cancellation_reason().map(String::from),
            compensation_failures: booking.compensation_failures().len(),
        }
    }
}

// -- Handlers --

/// POST /bookings: books every segment of a route and charges the passenger.
///
/// The saga runs in its own task, so a client that disconnects mid-request
/// does not stop it between an operator booking and its rollback.
#[tracing::instrument(skip(state, req), fields(route_id = %req.route_id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let task_state = Arc::clone(&state);
    let booking = tokio::spawn(
        async move { task_state.saga.create(req, &task_state.shutdown).await }
            .in_current_span(),
    )
    .await
    .map_err(|e| ApiError::Internal(format!("booking task failed: {e}")))??;
    Ok((StatusCode::CREATED, Json(BookingResponse::from(&booking))))
}

/// GET /bookings/{id}: loads a booking.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state.saga.get(booking_id).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// POST /bookings/{id}/cancel: refunds and cancels a confirmed booking.
#[tracing::instrument(skip(state, req))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let reason = req
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_CANCEL_REASON);

    let booking = state.saga.cancel(booking_id, reason).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

fn parse_booking_id(id: &str) -> Result<BookingId, ApiError> {
    BookingId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid booking id: {e}")))
}
