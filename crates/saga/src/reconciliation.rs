//! Payment webhook reconciliation.
//!
//! Provider notifications arrive after the synchronous saga call, possibly out
//! of order and possibly more than once. Each handler reloads the booking,
//! applies the transition if it is still meaningful and stores the result
//! under the repository's version check.

use std::collections::HashMap;

use chrono::Utc;
use common::BookingId;
use domain::{Booking, BookingStatus, Money, Payment, PaymentStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::{BookingRepository, StoreError};

use crate::compensation::rollback_segments;
use crate::error::{Result, SagaError};
use crate::services::ProviderRegistry;

/// Attempts for one event before a version conflict is returned.
const MAX_ATTEMPTS: u32 = 3;

const PAYMENT_CANCELED_REASON: &str = "payment canceled";

/// Raw notification body as the payment provider sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub event: String,
    pub object: WebhookObject,
}

/// The payment the notification is about.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
    /// Provider payment ID.
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub amount: Option<WebhookAmount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookAmount {
    pub value: String,
    pub currency: String,
}

/// Notification types the handler acts on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebhookEventType {
    PaymentSucceeded,
    PaymentCanceled,
    RefundSucceeded,
    Unknown(String),
}

impl WebhookEventType {
    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::PaymentSucceeded => "payment.succeeded",
            WebhookEventType::PaymentCanceled => "payment.canceled",
            WebhookEventType::RefundSucceeded => "refund.succeeded",
            WebhookEventType::Unknown(s) => s,
        }
    }
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "payment.succeeded" => WebhookEventType::PaymentSucceeded,
            "payment.canceled" => WebhookEventType::PaymentCanceled,
            "refund.succeeded" => WebhookEventType::RefundSucceeded,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated payment notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub event_type: WebhookEventType,
    pub provider_payment_id: String,
    pub order_id: BookingId,
    pub amount: Option<(Money, String)>,
}

impl WebhookEvent {
    /// Validates a raw payload.
    ///
    /// The order ID in `metadata.order_id` is required for every event type.
    pub fn parse(payload: WebhookPayload) -> Result<Self> {
        let order_id = payload
            .object
            .metadata
            .get("order_id")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                SagaError::InvalidRequest("order_id not found in metadata".to_string())
            })?;
        let order_id = BookingId::parse(order_id.trim())
            .map_err(|e| SagaError::InvalidRequest(format!("invalid order_id: {e}")))?;

        let amount = match payload.object.amount {
            Some(amount) => {
                let value: Decimal = amount.value.parse().map_err(|e| {
                    SagaError::InvalidRequest(format!("invalid amount {:?}: {e}", amount.value))
                })?;
                Some((Money::new(value), amount.currency))
            }
            None => None,
        };

        Ok(Self {
            event_type: WebhookEventType::from(payload.event.as_str()),
            provider_payment_id: payload.object.id,
            order_id,
            amount,
        })
    }

    /// Parses and validates a JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let payload: WebhookPayload = serde_json::from_slice(body)
            .map_err(|e| SagaError::InvalidRequest(format!("cannot parse webhook event: {e}")))?;
        Self::parse(payload)
    }
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// State changed and was stored.
    Applied,
    /// The booking already reflected the event.
    AlreadyApplied,
    /// The event was acknowledged without changing state.
    Ignored { reason: String },
}

/// Applies payment provider notifications to stored bookings.
pub struct ReconciliationHandler<B: BookingRepository> {
    bookings: B,
    providers: ProviderRegistry,
}

impl<B: BookingRepository> ReconciliationHandler<B> {
    /// `providers` is used to roll back segments of a booking whose payment
    /// was canceled before the saga could.
    pub fn new(bookings: B, providers: ProviderRegistry) -> Self {
        Self {
            bookings,
            providers,
        }
    }

    /// Handles one notification. Safe to call repeatedly with the same event.
    #[tracing::instrument(skip(self, event), fields(event = %event.event_type, order_id = %event.order_id))]
    pub async fn handle(&self, event: WebhookEvent) -> Result<ReconciliationOutcome> {
        metrics::counter!("reconciliation_events_total", "event" => event.event_type.as_str().to_string())
            .increment(1);

        if let WebhookEventType::Unknown(kind) = &event.event_type {
            return Ok(ignore_unknown(kind));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut booking = self
                .bookings
                .find_by_id(event.order_id)
                .await?
                .ok_or(SagaError::BookingNotFound(event.order_id))?;

            let outcome = match &event.event_type {
                WebhookEventType::PaymentSucceeded => {
                    self.payment_succeeded(&mut booking, &event)?
                }
                WebhookEventType::PaymentCanceled => self.payment_canceled(&mut booking).await?,
                WebhookEventType::RefundSucceeded => self.refund_succeeded(&mut booking)?,
                WebhookEventType::Unknown(kind) => return Ok(ignore_unknown(kind)),
            };

            if outcome != ReconciliationOutcome::Applied {
                return Ok(outcome);
            }

            match self.bookings.update(&booking).await {
                Ok(version) => {
                    tracing::info!(status = %booking.status(), %version, "webhook applied");
                    return Ok(outcome);
                }
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(attempt, "concurrent update, retrying webhook");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn payment_succeeded(
        &self,
        booking: &mut Booking,
        event: &WebhookEvent,
    ) -> Result<ReconciliationOutcome> {
        let booking_id = booking.id();
        let status = booking.status();
        let all_booked = booking.all_segments_booked();
        let payment = self.require_payment(booking)?;

        if status == BookingStatus::Confirmed && payment.status() == PaymentStatus::Completed {
            return Ok(ReconciliationOutcome::AlreadyApplied);
        }

        if status != BookingStatus::Pending {
            tracing::warn!(%booking_id, %status, "payment succeeded for closed booking, refund needs follow-up");
            return Ok(ReconciliationOutcome::Ignored {
                reason: format!("booking is {status}"),
            });
        }

        if payment.status() == PaymentStatus::Failed || payment.status() == PaymentStatus::Refunded {
            tracing::warn!(%booking_id, payment_status = %payment.status(), "payment succeeded for closed payment");
            return Ok(ReconciliationOutcome::Ignored {
                reason: format!("payment is {}", payment.status()),
            });
        }

        if let Some(reason) = charge_mismatch(payment, event) {
            tracing::warn!(%booking_id, provider_payment_id = %event.provider_payment_id, %reason, "payment succeeded for a different charge");
            return Ok(ReconciliationOutcome::Ignored { reason });
        }

        if !all_booked {
            return Err(self.inconsistent(
                booking_id,
                "payment succeeded but segments are not booked",
            ));
        }

        if payment.provider_payment_id().is_none() {
            payment.set_provider_payment_id(event.provider_payment_id.clone());
        }
        payment.mark_completed(Utc::now())?;
        booking.mark_confirmed()?;
        Ok(ReconciliationOutcome::Applied)
    }

    async fn payment_canceled(&self, booking: &mut Booking) -> Result<ReconciliationOutcome> {
        let booking_id = booking.id();
        let status = booking.status();
        let payment_status = self.require_payment(booking)?.status();

        if status == BookingStatus::Failed && payment_status == PaymentStatus::Failed {
            return Ok(ReconciliationOutcome::AlreadyApplied);
        }

        if status != BookingStatus::Pending || payment_status != PaymentStatus::Pending {
            tracing::warn!(%booking_id, %status, %payment_status, "ignoring payment cancellation");
            return Ok(ReconciliationOutcome::Ignored {
                reason: format!("booking is {status}, payment is {payment_status}"),
            });
        }

        if !booking.booked_segment_indices().is_empty() {
            let report = rollback_segments(&self.providers, booking).await;
            tracing::info!(
                %booking_id,
                compensated = report.compensated.len(),
                failed = report.failures.len(),
                "rolled back segments of canceled payment"
            );
        }

        if let Some(payment) = booking.payment_mut() {
            payment.mark_failed(PAYMENT_CANCELED_REASON)?;
        }
        booking.mark_failed(PAYMENT_CANCELED_REASON)?;
        Ok(ReconciliationOutcome::Applied)
    }

    fn refund_succeeded(&self, booking: &mut Booking) -> Result<ReconciliationOutcome> {
        let booking_id = booking.id();
        let status = booking.status();
        let payment = self.require_payment(booking)?;
        let payment_status = payment.status();

        if status == BookingStatus::Refunded && payment_status == PaymentStatus::Refunded {
            return Ok(ReconciliationOutcome::AlreadyApplied);
        }

        if status == BookingStatus::Pending
            || !matches!(
                payment_status,
                PaymentStatus::Completed | PaymentStatus::Refunded
            )
        {
            tracing::warn!(%booking_id, %status, %payment_status, "ignoring refund notification");
            return Ok(ReconciliationOutcome::Ignored {
                reason: format!("booking is {status}, payment is {payment_status}"),
            });
        }

        payment.mark_refunded(Utc::now())?;
        booking.mark_refunded()?;
        Ok(ReconciliationOutcome::Applied)
    }

    fn require_payment<'a>(&self, booking: &'a mut Booking) -> Result<&'a mut Payment> {
        let booking_id = booking.id();
        match booking.payment_mut() {
            Some(payment) => Ok(payment),
            None => Err(self.inconsistent(booking_id, "no payment attached")),
        }
    }

    fn inconsistent(&self, booking_id: BookingId, reason: &str) -> SagaError {
        metrics::counter!("reconciliation_inconsistent_total").increment(1);
        tracing::error!(%booking_id, reason, "inconsistent booking state");
        SagaError::Inconsistent {
            booking_id,
            reason: reason.to_string(),
        }
    }
}

/// Describes how `event` disagrees with the charge recorded on `payment`.
fn charge_mismatch(payment: &Payment, event: &WebhookEvent) -> Option<String> {
    if let Some(recorded) = payment.provider_payment_id()
        && recorded != event.provider_payment_id
    {
        return Some(format!(
            "provider payment id {} does not match {recorded}",
            event.provider_payment_id
        ));
    }

    if let Some((amount, currency)) = &event.amount {
        if amount.rounded() != payment.amount().rounded() {
            return Some(format!(
                "amount {amount} does not match {}",
                payment.amount()
            ));
        }
        if !currency.eq_ignore_ascii_case(payment.currency()) {
            return Some(format!(
                "currency {currency} does not match {}",
                payment.currency()
            ));
        }
    }
    None
}

fn ignore_unknown(kind: &str) -> ReconciliationOutcome {
    tracing::info!(event_type = %kind, "ignoring unknown webhook event");
    ReconciliationOutcome::Ignored {
        reason: format!("unknown event type {kind}"),
    }
}
