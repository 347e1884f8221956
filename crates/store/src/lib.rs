//! Persistence capability for the booking saga.
//!
//! The saga only needs to load routes and to save, update and load bookings.
//! No transactional semantics are assumed; writes are serialized per booking
//! by an optimistic version check, and a stored terminal booking can never be
//! moved back to a non-terminal status.

pub mod error;
pub mod memory;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::{InMemoryBookingRepository, InMemoryRouteRepository};
pub use repository::{BookingRepository, RouteRepository};
