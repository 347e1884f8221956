//! Domain error types.

use thiserror::Error;

use crate::booking::{BookingStatus, PaymentStatus};

/// Errors raised when a domain invariant would be violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The booking cannot move from its current status to the requested one.
    #[error("Invalid booking transition: {from} -> {to}")]
    InvalidBookingTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// The payment cannot move from its current status to the requested one.
    #[error("Invalid payment transition: {from} -> {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// The booking is not in a status that allows the requested action.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: BookingStatus,
        action: &'static str,
    },

    /// Confirmation was requested before all segments and the payment completed.
    #[error("Booking cannot be confirmed: {0}")]
    ConfirmationPrecondition(String),

    /// A payment is already attached to this booking.
    #[error("Booking already has a payment attached")]
    PaymentAlreadyAttached,

    /// No segment exists at the given position.
    #[error("No booked segment at index {0}")]
    SegmentIndexOutOfRange(usize),

    /// Passenger data failed validation.
    #[error("Invalid passenger: {0}")]
    InvalidPassenger(String),
}
