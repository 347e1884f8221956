//! Booking saga orchestrator.

use common::{BookingId, RouteId};
use domain::{
    BookedSegment, Booking, BookingStatus, DomainError, Passenger, PaymentMethod, PaymentStatus,
    Route,
};
use pricing::{CommissionCalculator, InsuranceCalculator};
use serde::Deserialize;
use store::{BookingRepository, RouteRepository, StoreError};

use crate::cancellation::CancellationToken;
use crate::compensation::rollback_segments;
use crate::error::{Result, SagaError};
use crate::locks::BookingLocks;
use crate::payment::PaymentProcessor;
use crate::services::{PaymentGateway, ProviderRegistry};

/// Input for a new booking.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub route_id: RouteId,
    pub passenger: Passenger,
    #[serde(default)]
    pub include_insurance: bool,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl BookingRequest {
    fn validate(&self) -> Result<()> {
        if self.route_id.is_blank() {
            return Err(SagaError::InvalidRequest("route_id is required".to_string()));
        }
        self.passenger.validate().map_err(|e| match e {
            DomainError::InvalidPassenger(msg) => SagaError::InvalidRequest(msg),
            other => SagaError::Domain(other),
        })
    }
}

/// Orchestrates booking a multi-segment journey as one purchase.
///
/// Segments are booked one by one in route order, then the passenger is
/// charged for the grand total. Any failure rolls back every segment that
/// committed, and the booking is persisted as failed with the reason.
pub struct BookingSaga<B, R, G>
where
    B: BookingRepository,
    R: RouteRepository,
    G: PaymentGateway,
{
    bookings: B,
    routes: R,
    providers: ProviderRegistry,
    payments: PaymentProcessor<G>,
    commission: CommissionCalculator,
    insurance: InsuranceCalculator,
    locks: BookingLocks,
}

impl<B, R, G> BookingSaga<B, R, G>
where
    B: BookingRepository,
    R: RouteRepository,
    G: PaymentGateway,
{
    /// Creates a saga with default commission and insurance rates.
    pub fn new(
        bookings: B,
        routes: R,
        providers: ProviderRegistry,
        payments: PaymentProcessor<G>,
    ) -> Self {
        Self {
            bookings,
            routes,
            providers,
            payments,
            commission: CommissionCalculator::default(),
            insurance: InsuranceCalculator::default(),
            locks: BookingLocks::new(),
        }
    }

    /// Replaces the commission calculator.
    pub fn with_commission(mut self, commission: CommissionCalculator) -> Self {
        self.commission = commission;
        self
    }

    /// Replaces the insurance calculator.
    pub fn with_insurance(mut self, insurance: InsuranceCalculator) -> Self {
        self.insurance = insurance;
        self
    }

    pub fn payments(&self) -> &PaymentProcessor<G> {
        &self.payments
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Books every segment of the requested route and charges the passenger.
    ///
    /// `cancel` is checked before each segment. On success the booking is
    /// confirmed. On failure the committed segments are rolled back, the
    /// booking is stored as failed and the error names the cause.
    #[tracing::instrument(skip(self, request, cancel), fields(route_id = %request.route_id))]
    pub async fn create(
        &self,
        request: BookingRequest,
        cancel: &CancellationToken,
    ) -> Result<Booking> {
        metrics::counter!("booking_saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let result = self.run(request, cancel).await;

        metrics::histogram!("booking_saga_duration_seconds")
            .record(saga_start.elapsed().as_secs_f64());
        match &result {
            Ok(booking) => {
                metrics::counter!("booking_saga_confirmed_total").increment(1);
                tracing::info!(booking_id = %booking.id(), grand_total = %booking.grand_total(), "booking confirmed");
            }
            Err(e) => {
                metrics::counter!("booking_saga_failed_total").increment(1);
                tracing::warn!(code = e.code(), error = %e, "booking saga failed");
            }
        }
        result
    }

    async fn run(&self, request: BookingRequest, cancel: &CancellationToken) -> Result<Booking> {
        // 1. Validate and resolve the priced route
        request.validate()?;

        let route = self
            .routes
            .find_by_id(&request.route_id)
            .await?
            .ok_or_else(|| SagaError::RouteNotFound(request.route_id.clone()))?;

        if route.is_empty() {
            return Err(SagaError::InvalidRoute(format!(
                "route {} has no segments",
                route.id
            )));
        }

        // 2. Fix pricing before any operator is contacted
        let mut booking = Booking::new(route.id.clone(), request.passenger);
        if request.include_insurance {
            let quote = self.insurance.quote(&route);
            booking.include_insurance_premium(quote.premium, Some(quote.coverage))?;
        }
        let version = self.bookings.save(&booking).await?;
        booking.set_version(version);
        tracing::info!(booking_id = %booking.id(), segments = route.segment_count(), "booking started");

        // 3. Book segments in route order
        self.book_segments(&route, &mut booking, cancel).await?;

        // 4. Charge the grand total
        let payment = self.payments.create(
            booking.id(),
            booking.grand_total(),
            request.payment_method,
        );
        booking.attach_payment(payment)?;
        match self.persist(&mut booking).await {
            Ok(()) => {}
            Err(SagaError::Store(e)) => return Err(self.unwind(booking, e).await),
            Err(e) => return Err(e),
        }

        self.charge(&mut booking).await?;

        // 5. Confirm
        let mut confirmed = booking.clone();
        confirmed.mark_confirmed()?;
        match self.persist_confirmation(confirmed).await {
            Ok(confirmed) => Ok(confirmed),
            Err(SagaError::Store(e)) => Err(self.unwind(booking, e).await),
            Err(e) => Err(e),
        }
    }

    async fn book_segments(
        &self,
        route: &Route,
        booking: &mut Booking,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for (index, segment) in route.segments.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(booking_id = %booking.id(), segment_index = index, "booking cancelled by caller");
                let compensation = rollback_segments(&self.providers, booking).await;
                self.record_failure(
                    booking,
                    format!("booking cancelled by caller before segment {index}"),
                )
                .await;
                return Err(SagaError::Cancelled {
                    booking_id: booking.id(),
                    segment_index: index,
                    compensation,
                });
            }

            tracing::info!(
                booking_id = %booking.id(),
                segment_index = index,
                segment_id = %segment.id,
                provider = %segment.provider,
                "booking segment"
            );

            let commission = self
                .commission
                .commission(&segment.transport_type, segment.price);

            let result = match self.providers.get(&segment.provider) {
                Ok(gateway) => gateway.book(segment, booking.passenger()).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(confirmation) => {
                    booking.add_segment(BookedSegment::new(
                        segment,
                        confirmation.ticket_number,
                        confirmation.booking_ref,
                        commission,
                    ))?;
                }
                Err(e) => {
                    let reason = e.to_string();
                    tracing::warn!(booking_id = %booking.id(), segment_index = index, error = %reason, "segment booking failed");

                    let compensation = rollback_segments(&self.providers, booking).await;
                    let from = segment.from.name.clone();
                    let to = segment.to.name.clone();
                    self.record_failure(
                        booking,
                        format!("segment {index} ({from} -> {to}) could not be booked: {reason}"),
                    )
                    .await;
                    return Err(SagaError::SegmentBookingFailed {
                        booking_id: booking.id(),
                        segment_index: index,
                        from,
                        to,
                        reason,
                        compensation,
                    });
                }
            }
        }
        Ok(())
    }

    async fn charge(&self, booking: &mut Booking) -> Result<()> {
        let booking_id = booking.id();
        let payment = booking.payment_mut().ok_or_else(|| SagaError::Inconsistent {
            booking_id,
            reason: "no payment attached".to_string(),
        })?;

        if let Err(e) = self.payments.charge(payment).await {
            let reason = e.to_string();
            let compensation = rollback_segments(&self.providers, booking).await;
            self.record_failure(booking, format!("payment failed: {reason}"))
                .await;
            return Err(SagaError::PaymentFailed {
                booking_id,
                reason,
                compensation,
            });
        }
        Ok(())
    }

    /// Marks the booking failed and stores it.
    ///
    /// A storage error here is logged rather than returned so the caller
    /// still sees why the saga failed.
    async fn record_failure(&self, booking: &mut Booking, reason: String) {
        if let Err(e) = booking.mark_failed(reason) {
            tracing::error!(booking_id = %booking.id(), error = %e, "failed to mark booking failed");
            return;
        }
        if let Err(e) = self.persist(booking).await {
            tracing::error!(booking_id = %booking.id(), error = %e, "failed to store failed booking");
        }
    }

    /// Undoes everything committed for a booking whose write failed.
    ///
    /// A completed payment is refunded, every booked segment is cancelled and
    /// the booking is stored as failed if storage accepts the write.
    async fn unwind(&self, mut booking: Booking, source: StoreError) -> SagaError {
        let booking_id = booking.id();
        tracing::error!(%booking_id, error = %source, "failed to store booking, unwinding");
        metrics::counter!("booking_saga_unwinds_total").increment(1);

        if let Some(payment) = booking.payment_mut() {
            match payment.status() {
                PaymentStatus::Completed => {
                    if let Err(e) = self.payments.refund(payment).await {
                        tracing::error!(%booking_id, error = %e, "refund after storage failure failed");
                    }
                }
                PaymentStatus::Pending => {
                    if let Err(e) = payment.mark_failed("booking could not be stored") {
                        tracing::error!(%booking_id, error = %e, "failed to mark payment failed");
                    }
                }
                _ => {}
            }
        }

        let compensation = rollback_segments(&self.providers, &mut booking).await;
        self.record_failure(&mut booking, format!("booking could not be stored: {source}"))
            .await;

        SagaError::PersistFailed {
            booking_id,
            source,
            compensation,
        }
    }

    async fn persist(&self, booking: &mut Booking) -> Result<()> {
        let version = self.bookings.update(booking).await?;
        booking.set_version(version);
        Ok(())
    }

    /// Stores the confirmed booking.
    ///
    /// If a payment webhook confirmed the booking in the meantime, the stored
    /// booking is returned instead.
    async fn persist_confirmation(&self, mut booking: Booking) -> Result<Booking> {
        match self.persist(&mut booking).await {
            Ok(()) => Ok(booking),
            Err(SagaError::Store(StoreError::ConcurrencyConflict { .. })) => {
                let stored = self
                    .bookings
                    .find_by_id(booking.id())
                    .await?
                    .ok_or(SagaError::BookingNotFound(booking.id()))?;
                if stored.status() == BookingStatus::Confirmed {
                    tracing::info!(booking_id = %stored.id(), "booking already confirmed by reconciliation");
                    Ok(stored)
                } else {
                    Err(SagaError::Conflict(format!(
                        "booking {} changed to {} while confirming",
                        stored.id(),
                        stored.status()
                    )))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Loads a booking.
    pub async fn get(&self, booking_id: BookingId) -> Result<Booking> {
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(SagaError::BookingNotFound(booking_id))
    }

    /// Cancels a confirmed booking.
    ///
    /// Concurrent cancels of the same booking run one after the other; the
    /// later one sees the stored result and fails with a conflict. The payment
    /// is refunded first and the refund is stored before anything else. If the
    /// refund cannot be confirmed the booking is left confirmed and the error
    /// is returned. The segments are then rolled back best-effort and the
    /// booking is stored as cancelled.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(&self, booking_id: BookingId, reason: &str) -> Result<Booking> {
        let lock = self.locks.acquire(booking_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.cancel_exclusive(booking_id, reason).await
        };
        self.locks.release(booking_id, lock).await;
        result
    }

    async fn cancel_exclusive(&self, booking_id: BookingId, reason: &str) -> Result<Booking> {
        let mut booking = self.get(booking_id).await?;

        if booking.status() != BookingStatus::Confirmed {
            return Err(SagaError::Conflict(format!(
                "booking {} is {}, only confirmed bookings can be cancelled",
                booking_id,
                booking.status()
            )));
        }

        if let Some(payment) = booking.payment_mut()
            && payment.status() == PaymentStatus::Completed
        {
            self.payments
                .refund(payment)
                .await
                .map_err(|e| SagaError::RefundFailed {
                    booking_id,
                    reason: e.to_string(),
                })?;
            // a retry after a later failure must not refund again
            self.persist(&mut booking).await?;
        }

        let compensation = rollback_segments(&self.providers, &mut booking).await;
        if !compensation.is_clean() {
            tracing::warn!(
                %booking_id,
                failures = compensation.failures.len(),
                "booking cancelled with compensation failures"
            );
        }

        booking.mark_cancelled(reason)?;
        self.persist(&mut booking).await?;

        tracing::info!(%booking_id, "booking cancelled");
        Ok(booking)
    }
}
