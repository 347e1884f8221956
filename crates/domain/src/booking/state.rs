//! Booking and payment state machines.

use serde::{Deserialize, Serialize};

/// The status of a booking in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed ──┬──► Cancelled ──► Refunded
///           │                └──────────────► Refunded
///           └──► Failed ────────────────────► Refunded
/// ```
/// The move into `Refunded` from a terminal status is refund bookkeeping only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Segments are being booked or payment is outstanding.
    #[default]
    Pending,

    /// Every segment is booked and the payment completed.
    Confirmed,

    /// Segment booking or payment failed (terminal state).
    Failed,

    /// Cancelled after confirmation (terminal state).
    Cancelled,

    /// Money returned to the passenger (terminal state).
    Refunded,
}

impl BookingStatus {
    /// Returns true if moving to `next` is allowed. Same-status moves are allowed.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        *self == next
            || matches!(
                (self, next),
                (Pending, Confirmed)
                    | (Pending, Failed)
                    | (Confirmed, Cancelled)
                    | (Confirmed, Refunded)
                    | (Cancelled, Refunded)
                    | (Failed, Refunded)
            )
    }

    /// Returns true if the booking can still take new segments and a payment.
    pub fn is_open(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Failed | BookingStatus::Cancelled | BookingStatus::Refunded
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Failed => "failed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The status of a payment.
///
/// ```text
/// Pending ──┬──► Completed ──► Refunded
///           └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Returns true if moving to `next` is allowed. Same-status moves are allowed.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;

        *self == next
            || matches!(
                (self, next),
                (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
            )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
