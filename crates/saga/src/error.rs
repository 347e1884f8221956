//! Saga error types.

use common::{BookingId, RouteId};
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

use crate::compensation::CompensationReport;

/// Coarse error category, used by callers to decide how to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A route or booking does not exist.
    NotFound,
    /// Malformed input.
    Invalid,
    /// The request conflicts with the booking's current state.
    Conflict,
    /// An operator or the payment gateway failed.
    UpstreamFailure,
    /// Stored state contradicts an inbound event.
    Inconsistent,
    /// Storage or other internal failure.
    Internal,
}

/// Errors that can occur during booking saga operations.
///
/// Variants for failed bookings carry the rollback outcome as secondary data.
/// The `Display` message is always the reason the saga failed.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Route not found.
    #[error("Route not found: {0}")]
    RouteNotFound(RouteId),

    /// Booking not found.
    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    /// The route cannot be booked as given.
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// The request failed validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The booking is not in a state that allows the operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An operator could not book a segment. Earlier segments were rolled back.
    #[error("Segment {segment_index} ({from} -> {to}) could not be booked: {reason}")]
    SegmentBookingFailed {
        booking_id: BookingId,
        segment_index: usize,
        from: String,
        to: String,
        reason: String,
        compensation: CompensationReport,
    },

    /// Charging the passenger failed. Every segment was rolled back.
    #[error("Payment failed: {reason}")]
    PaymentFailed {
        booking_id: BookingId,
        reason: String,
        compensation: CompensationReport,
    },

    /// The caller cancelled the booking while segments were being booked.
    #[error("Booking cancelled before segment {segment_index}")]
    Cancelled {
        booking_id: BookingId,
        segment_index: usize,
        compensation: CompensationReport,
    },

    /// Storing the booking failed after operators or the gateway had
    /// committed. Everything committed was unwound.
    #[error("Booking {booking_id} could not be stored: {source}")]
    PersistFailed {
        booking_id: BookingId,
        source: StoreError,
        compensation: CompensationReport,
    },

    /// The refund could not be confirmed, so the booking was left as is.
    #[error("Refund failed for booking {booking_id}: {reason}")]
    RefundFailed { booking_id: BookingId, reason: String },

    /// Operator gateway error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Payment gateway error.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Stored state contradicts an inbound event.
    #[error("Inconsistent state for booking {booking_id}: {reason}")]
    Inconsistent {
        booking_id: BookingId,
        reason: String,
    },

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl SagaError {
    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SagaError::RouteNotFound(_) | SagaError::BookingNotFound(_) => ErrorKind::NotFound,
            SagaError::InvalidRoute(_) | SagaError::InvalidRequest(_) => ErrorKind::Invalid,
            SagaError::Conflict(_) | SagaError::Cancelled { .. } | SagaError::Domain(_) => {
                ErrorKind::Conflict
            }
            SagaError::SegmentBookingFailed { .. }
            | SagaError::PaymentFailed { .. }
            | SagaError::RefundFailed { .. }
            | SagaError::Provider(_)
            | SagaError::Gateway(_) => ErrorKind::UpstreamFailure,
            SagaError::Inconsistent { .. } => ErrorKind::Inconsistent,
            SagaError::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            SagaError::Store(
                StoreError::ConcurrencyConflict { .. } | StoreError::TerminalStateRegression { .. },
            ) => ErrorKind::Conflict,
            SagaError::Store(_) | SagaError::PersistFailed { .. } => ErrorKind::Internal,
        }
    }

    /// Returns a stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            SagaError::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            SagaError::BookingNotFound(_) | SagaError::Store(StoreError::NotFound(_)) => {
                "BOOKING_NOT_FOUND"
            }
            SagaError::InvalidRoute(_) => "INVALID_ROUTE",
            SagaError::InvalidRequest(_) => "INVALID_REQUEST",
            SagaError::Conflict(_) | SagaError::Domain(_) => "CONFLICT",
            SagaError::SegmentBookingFailed { .. } | SagaError::Provider(_) => {
                "SEGMENT_BOOKING_FAILED"
            }
            SagaError::PaymentFailed { .. } | SagaError::Gateway(_) => "PAYMENT_FAILED",
            SagaError::Cancelled { .. } => "BOOKING_CANCELLED",
            SagaError::RefundFailed { .. } => "REFUND_FAILED",
            SagaError::Inconsistent { .. } => "INCONSISTENT_STATE",
            SagaError::Store(
                StoreError::ConcurrencyConflict { .. } | StoreError::TerminalStateRegression { .. },
            ) => "CONFLICT",
            SagaError::Store(_) | SagaError::PersistFailed { .. } => "STORAGE_ERROR",
        }
    }

    /// Returns the rollback outcome for failures that triggered one.
    pub fn compensation(&self) -> Option<&CompensationReport> {
        match self {
            SagaError::SegmentBookingFailed { compensation, .. }
            | SagaError::PaymentFailed { compensation, .. }
            | SagaError::Cancelled { compensation, .. }
            | SagaError::PersistFailed { compensation, .. } => Some(compensation),
            _ => None,
        }
    }

    /// Returns the booking a failed saga left behind, if any.
    pub fn booking_id(&self) -> Option<BookingId> {
        match self {
            SagaError::SegmentBookingFailed { booking_id, .. }
            | SagaError::PaymentFailed { booking_id, .. }
            | SagaError::Cancelled { booking_id, .. }
            | SagaError::PersistFailed { booking_id, .. }
            | SagaError::RefundFailed { booking_id, .. }
            | SagaError::Inconsistent { booking_id, .. } => Some(*booking_id),
            SagaError::BookingNotFound(id) => Some(*id),
            _ => None,
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{BookingStatus, Version};

    #[test]
    fn test_kinds_and_codes() {
        let id = BookingId::new();
        let cases = [
            (
                SagaError::RouteNotFound(RouteId::new("r")),
                ErrorKind::NotFound,
                "ROUTE_NOT_FOUND",
            ),
            (
                SagaError::InvalidRoute("empty".to_string()),
                ErrorKind::Invalid,
                "INVALID_ROUTE",
            ),
            (
                SagaError::Conflict("pending".to_string()),
                ErrorKind::Conflict,
                "CONFLICT",
            ),
            (
                SagaError::PaymentFailed {
                    booking_id: id,
                    reason: "declined".to_string(),
                    compensation: CompensationReport::default(),
                },
                ErrorKind::UpstreamFailure,
                "PAYMENT_FAILED",
            ),
            (
                SagaError::Inconsistent {
                    booking_id: id,
                    reason: "no payment".to_string(),
                },
                ErrorKind::Inconsistent,
                "INCONSISTENT_STATE",
            ),
            (
                SagaError::Store(StoreError::Backend("down".to_string())),
                ErrorKind::Internal,
                "STORAGE_ERROR",
            ),
            (
                SagaError::PersistFailed {
                    booking_id: id,
                    source: StoreError::Backend("down".to_string()),
                    compensation: CompensationReport::default(),
                },
                ErrorKind::Internal,
                "STORAGE_ERROR",
            ),
            (
                SagaError::Store(StoreError::ConcurrencyConflict {
                    booking_id: id,
                    expected: Version::first(),
                    actual: Version::new(2),
                }),
                ErrorKind::Conflict,
                "CONFLICT",
            ),
            (
                SagaError::Domain(DomainError::InvalidBookingTransition {
                    from: BookingStatus::Failed,
                    to: BookingStatus::Confirmed,
                }),
                ErrorKind::Conflict,
                "CONFLICT",
            ),
        ];

        for (error, kind, code) in cases {
            assert_eq!(error.kind(), kind, "{error}");
            assert_eq!(error.code(), code, "{error}");
        }
    }

    #[test]
    fn test_segment_failure_message_names_segment_and_endpoints() {
        let error = SagaError::SegmentBookingFailed {
            booking_id: BookingId::new(),
            segment_index: 1,
            from: "Yakutsk".to_string(),
            to: "Lensk".to_string(),
            reason: "no seats".to_string(),
            compensation: CompensationReport::default(),
        };
        assert_eq!(
            error.to_string(),
            "Segment 1 (Yakutsk -> Lensk) could not be booked: no seats"
        );
        assert!(error.compensation().is_some());
    }
}
