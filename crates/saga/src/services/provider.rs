//! Operator booking capability, provider registry and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::SegmentId;
use domain::{Passenger, Segment};

use crate::error::SagaError;

/// Result of a successful operator booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderBooking {
    /// Ticket number issued to the passenger.
    pub ticket_number: String,
    /// Operator reference, needed to cancel the booking later.
    pub booking_ref: String,
}

/// Books and cancels single segments with one operator.
#[async_trait]
pub trait ProviderBookingGateway: Send + Sync {
    /// Books one segment for the passenger.
    async fn book(
        &self,
        segment: &Segment,
        passenger: &Passenger,
    ) -> Result<ProviderBooking, SagaError>;

    /// Cancels a booking made by a prior successful `book`. Idempotent.
    async fn cancel(&self, booking_ref: &str) -> Result<(), SagaError>;
}

/// Operator gateways by provider name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    gateways: HashMap<String, Arc<dyn ProviderBookingGateway>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the gateway serving `provider`, replacing any previous one.
    pub fn register(
        &mut self,
        provider: impl Into<String>,
        gateway: Arc<dyn ProviderBookingGateway>,
    ) {
        self.gateways.insert(provider.into(), gateway);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(
        mut self,
        provider: impl Into<String>,
        gateway: Arc<dyn ProviderBookingGateway>,
    ) -> Self {
        self.register(provider, gateway);
        self
    }

    /// Returns the gateway serving `provider`.
    pub fn get(&self, provider: &str) -> Result<&Arc<dyn ProviderBookingGateway>, SagaError> {
        self.gateways
            .get(provider)
            .ok_or_else(|| SagaError::Provider(format!("no gateway registered for {provider}")))
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<&String> = self.gateways.keys().collect();
        providers.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &providers)
            .finish()
    }
}

#[derive(Debug, Default)]
struct InMemoryProviderState {
    active: HashMap<String, SegmentId>,
    book_calls: Vec<SegmentId>,
    cancel_calls: Vec<String>,
    next_id: u32,
    fail_on_book: bool,
    fail_on_segments: HashSet<SegmentId>,
    fail_on_cancel: bool,
}

/// In-memory operator gateway for testing.
#[derive(Debug, Clone)]
pub struct InMemoryProviderGateway {
    prefix: String,
    state: Arc<RwLock<InMemoryProviderState>>,
}

impl Default for InMemoryProviderGateway {
    fn default() -> Self {
        Self::new("PNR")
    }
}

impl InMemoryProviderGateway {
    /// Creates a gateway whose booking references start with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            state: Arc::new(RwLock::new(InMemoryProviderState::default())),
        }
    }

    /// Configures every book call to fail.
    pub fn set_fail_on_book(&self, fail: bool) {
        self.state.write().unwrap().fail_on_book = fail;
    }

    /// Configures book calls for one segment to fail.
    pub fn fail_on_segment(&self, segment_id: impl Into<SegmentId>) {
        self.state
            .write()
            .unwrap()
            .fail_on_segments
            .insert(segment_id.into());
    }

    /// Configures every cancel call to fail.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Segments `book` was called with, in call order.
    pub fn book_calls(&self) -> Vec<SegmentId> {
        self.state.read().unwrap().book_calls.clone()
    }

    /// References `cancel` was called with, in call order.
    pub fn cancel_calls(&self) -> Vec<String> {
        self.state.read().unwrap().cancel_calls.clone()
    }

    /// Number of cancel calls made with `booking_ref`.
    pub fn cancel_count(&self, booking_ref: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .cancel_calls
            .iter()
            .filter(|r| r.as_str() == booking_ref)
            .count()
    }

    /// Number of bookings currently held with this operator.
    pub fn active_bookings(&self) -> usize {
        self.state.read().unwrap().active.len()
    }

    /// Returns true if `booking_ref` is currently held.
    pub fn is_active(&self, booking_ref: &str) -> bool {
        self.state.read().unwrap().active.contains_key(booking_ref)
    }
}

#[async_trait]
impl ProviderBookingGateway for InMemoryProviderGateway {
    async fn book(
        &self,
        segment: &Segment,
        _passenger: &Passenger,
    ) -> Result<ProviderBooking, SagaError> {
        let mut state = self.state.write().unwrap();
        state.book_calls.push(segment.id.clone());

        if state.fail_on_book || state.fail_on_segments.contains(&segment.id) {
            return Err(SagaError::Provider(format!(
                "no seats available on {}",
                segment.id
            )));
        }

        state.next_id += 1;
        let booking_ref = format!("{}-{:04}", self.prefix, state.next_id);
        let ticket_number = format!("TKT-{}-{:04}", self.prefix, state.next_id);
        state.active.insert(booking_ref.clone(), segment.id.clone());

        Ok(ProviderBooking {
            ticket_number,
            booking_ref,
        })
    }

    async fn cancel(&self, booking_ref: &str) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();
        state.cancel_calls.push(booking_ref.to_string());

        if state.fail_on_cancel {
            return Err(SagaError::Provider(format!(
                "operator timeout cancelling {booking_ref}"
            )));
        }

        state.active.remove(booking_ref);
        Ok(())
    }
}
