//! Shared identifier types used across the booking workspace.

mod types;

pub use types::{BookingId, PaymentId, RouteId, SegmentId};
