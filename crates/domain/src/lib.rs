//! Domain layer for the journey booking system.
//!
//! This crate provides the data model the booking saga operates on:
//! - Route and Segment, the priced input produced by route search
//! - Booking aggregate with its booked segments and payment
//! - Booking and payment state machines
//! - Money backed by exact decimal arithmetic

pub mod booking;
pub mod error;
pub mod route;
pub mod version;

pub use booking::{
    BookedSegment, Booking, BookingStatus, CompensationFailure, CoverageLevel, InsuranceCoverage,
    Money, Passenger, Payment, PaymentMethod, PaymentStatus, SegmentStatus,
};
pub use error::DomainError;
pub use route::{Route, Segment, Stop, TransportType};
pub use version::Version;
