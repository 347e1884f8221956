//! Payment record attached to a booking.

use chrono::{DateTime, Utc};
use common::{BookingId, PaymentId};
use serde::{Deserialize, Serialize};

use super::{Money, PaymentStatus};
use crate::error::DomainError;

/// How the passenger pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    YooKassa,
    CloudPayments,
    SberPay,
}

impl PaymentMethod {
    /// Returns the method name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::YooKassa => "yookassa",
            PaymentMethod::CloudPayments => "cloudpayments",
            PaymentMethod::SberPay => "sberpay",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single charge for a booking.
///
/// The amount is fixed when the payment is created and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    order_id: BookingId,
    amount: Money,
    currency: String,
    method: PaymentMethod,
    status: PaymentStatus,
    provider_payment_id: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl Payment {
    /// Creates a pending payment with no provider ID yet.
    pub fn new(
        order_id: BookingId,
        amount: Money,
        currency: impl Into<String>,
        method: PaymentMethod,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            order_id,
            amount,
            currency: currency.into(),
            method,
            status: PaymentStatus::Pending,
            provider_payment_id: None,
            created_at: Utc::now(),
            completed_at: None,
            refunded_at: None,
            failure_reason: None,
        }
    }

    /// Returns the internal payment ID.
    pub fn id(&self) -> PaymentId {
        self.id
    }

    /// Returns the booking this payment belongs to.
    pub fn order_id(&self) -> BookingId {
        self.order_id
    }

    /// Returns the amount fixed at creation.
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the ISO currency code.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Returns the payment method.
    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    /// Returns the current status.
    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    /// Returns the payment gateway's transaction ID, if assigned.
    pub fn provider_payment_id(&self) -> Option<&str> {
        self.provider_payment_id.as_deref()
    }

    /// Returns when the payment was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the payment completed, if it did.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns when the payment was refunded, if it was.
    pub fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    /// Returns the failure reason, if the payment failed.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Records the gateway's transaction ID.
    pub fn set_provider_payment_id(&mut self, id: impl Into<String>) {
        self.provider_payment_id = Some(id.into());
    }

    /// Marks the payment completed.
    ///
    /// Returns `Ok(false)` without touching timestamps if it already was.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> Result<bool, DomainError> {
        if !self.transition(PaymentStatus::Completed)? {
            return Ok(false);
        }
        self.completed_at = Some(at);
        Ok(true)
    }

    /// Marks the payment failed with a reason.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<bool, DomainError> {
        if !self.transition(PaymentStatus::Failed)? {
            return Ok(false);
        }
        self.failure_reason = Some(reason.into());
        Ok(true)
    }

    /// Marks a completed payment refunded.
    pub fn mark_refunded(&mut self, at: DateTime<Utc>) -> Result<bool, DomainError> {
        if !self.transition(PaymentStatus::Refunded)? {
            return Ok(false);
        }
        self.refunded_at = Some(at);
        Ok(true)
    }

    fn transition(&mut self, to: PaymentStatus) -> Result<bool, DomainError> {
        if self.status == to {
            return Ok(false);
        }
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidPaymentTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(true)
    }
}
