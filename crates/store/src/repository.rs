use async_trait::async_trait;
use common::{BookingId, RouteId};
use domain::{Booking, Route, Version};

use crate::Result;

/// Storage for booking aggregates.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persists a booking that has never been stored.
    ///
    /// Fails with `AlreadyExists` if the ID is taken. Returns the stored version.
    async fn save(&self, booking: &Booking) -> Result<Version>;

    /// Replaces a stored booking.
    ///
    /// `booking.version()` must equal the stored version, otherwise the write
    /// fails with `ConcurrencyConflict`. A stored terminal booking cannot be
    /// replaced by a non-terminal one (`TerminalStateRegression`).
    /// Returns the new stored version.
    async fn update(&self, booking: &Booking) -> Result<Version>;

    /// Loads a booking, or `None` if it does not exist.
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>>;
}

/// Read access to priced routes produced by route search.
#[async_trait]
pub trait RouteRepository: Send + Sync {
    /// Loads a route, or `None` if it does not exist.
    async fn find_by_id(&self, id: &RouteId) -> Result<Option<Route>>;
}
