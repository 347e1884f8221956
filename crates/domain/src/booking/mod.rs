//! Booking aggregate and related types.

mod aggregate;
mod payment;
mod segment;
mod state;
mod value_objects;

pub use aggregate::Booking;
pub use payment::{Payment, PaymentMethod};
pub use segment::{BookedSegment, CompensationFailure, SegmentStatus};
pub use state::{BookingStatus, PaymentStatus};
pub use value_objects::{CoverageLevel, InsuranceCoverage, Money, Passenger};
