use common::BookingId;
use domain::{BookingStatus, Version};
use thiserror::Error;

/// Errors that can occur when interacting with a repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The booking does not exist.
    #[error("Booking not found: {0}")]
    NotFound(BookingId),

    /// A booking with this ID was already saved.
    #[error("Booking already exists: {0}")]
    AlreadyExists(BookingId),

    /// The stored version did not match the version the writer read.
    #[error(
        "Concurrency conflict for booking {booking_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        booking_id: BookingId,
        expected: Version,
        actual: Version,
    },

    /// The write would move a terminal booking back to a non-terminal status.
    #[error("Booking {booking_id} is {stored}; refusing to store it as {attempted}")]
    TerminalStateRegression {
        booking_id: BookingId,
        stored: BookingStatus,
        attempted: BookingStatus,
    },

    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StoreError>;
