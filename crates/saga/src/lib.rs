//! Booking saga for multi-segment journeys.
//!
//! This crate turns a set of independent operator bookings and a payment into
//! one purchase that appears atomic to the passenger:
//! 1. Book each segment with its operator, in route order
//! 2. Charge the passenger for the grand total
//! 3. Confirm the booking
//!
//! If any step fails, every segment already booked is cancelled in reverse
//! order. Payment provider webhooks are reconciled against stored bookings
//! afterwards by [`ReconciliationHandler`].

pub mod cancellation;
pub mod compensation;
pub mod coordinator;
pub mod error;
pub mod locks;
pub mod payment;
pub mod reconciliation;
pub mod services;

pub use cancellation::CancellationToken;
pub use compensation::{CompensationReport, rollback_segments};
pub use coordinator::{BookingRequest, BookingSaga};
pub use error::{ErrorKind, Result, SagaError};
pub use locks::BookingLocks;
pub use payment::PaymentProcessor;
pub use reconciliation::{
    ReconciliationHandler, ReconciliationOutcome, WebhookAmount, WebhookEvent, WebhookEventType,
    WebhookObject, WebhookPayload,
};
pub use services::{
    InMemoryPaymentGateway, InMemoryProviderGateway, PaymentGateway, ProviderBooking,
    ProviderBookingGateway, ProviderRegistry,
};
