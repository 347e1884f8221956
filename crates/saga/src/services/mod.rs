//! External capabilities the saga drives, with in-memory implementations.

pub mod payment;
pub mod provider;

pub use payment::{InMemoryPaymentGateway, PaymentGateway};
pub use provider::{
    InMemoryProviderGateway, ProviderBooking, ProviderBookingGateway, ProviderRegistry,
};
