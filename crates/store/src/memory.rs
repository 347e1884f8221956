use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BookingId, RouteId};
use domain::{Booking, Route, Version};
use tokio::sync::RwLock;

use crate::{BookingRepository, Result, RouteRepository, StoreError};

/// In-memory booking repository.
///
/// Cloning shares the underlying map, so a test can hand one clone to the
/// saga and inspect stored state through another.
#[derive(Clone, Default)]
pub struct InMemoryBookingRepository {
    bookings: Arc<RwLock<HashMap<BookingId, Booking>>>,
}

impl InMemoryBookingRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored bookings.
    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }

    /// Returns true if no bookings are stored.
    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn save(&self, booking: &Booking) -> Result<Version> {
        let mut store = self.bookings.write().await;
        if store.contains_key(&booking.id()) {
            return Err(StoreError::AlreadyExists(booking.id()));
        }

        let version = Version::first();
        let mut stored = booking.clone();
        stored.set_version(version);
        store.insert(booking.id(), stored);

        tracing::debug!(booking_id = %booking.id(), %version, "booking saved");
        Ok(version)
    }

    async fn update(&self, booking: &Booking) -> Result<Version> {
        let mut store = self.bookings.write().await;
        let current = store
            .get(&booking.id())
            .ok_or(StoreError::NotFound(booking.id()))?;

        if current.version() != booking.version() {
            return Err(StoreError::ConcurrencyConflict {
                booking_id: booking.id(),
                expected: booking.version(),
                actual: current.version(),
            });
        }

        if current.status().is_terminal() && !booking.status().is_terminal() {
            return Err(StoreError::TerminalStateRegression {
                booking_id: booking.id(),
                stored: current.status(),
                attempted: booking.status(),
            });
        }

        let version = current.version().next();
        let mut stored = booking.clone();
        stored.set_version(version);
        store.insert(booking.id(), stored);

        tracing::debug!(booking_id = %booking.id(), %version, "booking updated");
        Ok(version)
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }
}

/// In-memory route repository, seeded by the caller.
#[derive(Clone, Default)]
pub struct InMemoryRouteRepository {
    routes: Arc<RwLock<HashMap<RouteId, Route>>>,
}

impl InMemoryRouteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a route.
    pub async fn insert(&self, route: Route) {
        self.routes.write().await.insert(route.id.clone(), route);
    }

    /// Creates a repository holding the given routes.
    pub async fn with_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        let repo = Self::new();
        for route in routes {
            repo.insert(route).await;
        }
        repo
    }
}

#[async_trait]
impl RouteRepository for InMemoryRouteRepository {
    async fn find_by_id(&self, id: &RouteId) -> Result<Option<Route>> {
        Ok(self.routes.read().await.get(id).cloned())
    }
}
