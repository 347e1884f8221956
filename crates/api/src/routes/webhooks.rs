//! Payment provider webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use saga::{ErrorKind, ReconciliationOutcome, WebhookEvent};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(flatten)]
    pub outcome: Option<ReconciliationOutcome>,
}

/// POST /webhooks/payment: applies a payment provider notification.
///
/// Any event that was handled, ignored or already applied is acknowledged
/// with 200 so the provider stops redelivering it. Inconsistent state is
/// acknowledged too since redelivery cannot fix it; it is logged for manual
/// follow-up. Malformed bodies get 400 and storage failures 5xx, which the
/// provider retries.
#[tracing::instrument(skip(state, body))]
pub async fn payment(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let event = WebhookEvent::from_json(&body)?;
    let order_id = event.order_id;

    match state.reconciliation.handle(event).await {
        Ok(outcome) => Ok(Json(WebhookAck {
            status: "ok",
            outcome: Some(outcome),
        })),
        Err(e) if e.kind() == ErrorKind::Inconsistent => {
            tracing::error!(%order_id, error = %e, "acknowledging webhook for inconsistent booking");
            Ok(Json(WebhookAck {
                status: "ok",
                outcome: None,
            }))
        }
        Err(e) => Err(e.into()),
    }
}
