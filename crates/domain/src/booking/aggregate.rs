//! Booking aggregate implementation.

use chrono::{DateTime, Utc};
use common::{BookingId, RouteId};
use serde::{Deserialize, Serialize};

use super::{
    BookedSegment, BookingStatus, CompensationFailure, InsuranceCoverage, Money, Passenger,
    Payment, PaymentStatus, SegmentStatus,
};
use crate::error::DomainError;
use crate::version::Version;

/// Booking aggregate root.
///
/// The consistency boundary for one journey purchase: the passenger, the
/// segments committed with operators, the running totals and the payment.
/// Totals are maintained incrementally as segments are appended in route
/// order, so `grand_total == total_price + total_commission + premium`
/// (premium only when insurance is included) holds after every append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    id: BookingId,

    /// Stored version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    route_id: RouteId,
    passenger: Passenger,
    segments: Vec<BookedSegment>,

    total_price: Money,
    total_commission: Money,
    grand_total: Money,

    include_insurance: bool,
    insurance_premium: Money,
    insurance_coverage: Option<InsuranceCoverage>,

    status: BookingStatus,
    payment: Option<Payment>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,

    /// Rollbacks that did not go through.
    #[serde(default)]
    compensation_failures: Vec<CompensationFailure>,
}

// Query methods
impl Booking {
    pub fn id(&self) -> BookingId {
        self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the stored version. Called after a successful repository write.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn route_id(&self) -> &RouteId {
        &self.route_id
    }

    pub fn passenger(&self) -> &Passenger {
        &self.passenger
    }

    /// Booked segments in route order.
    pub fn segments(&self) -> &[BookedSegment] {
        &self.segments
    }

    /// Sum of operator base prices.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    /// Sum of commissions.
    pub fn total_commission(&self) -> Money {
        self.total_commission
    }

    /// Everything the passenger pays.
    pub fn grand_total(&self) -> Money {
        self.grand_total
    }

    pub fn include_insurance(&self) -> bool {
        self.include_insurance
    }

    pub fn insurance_premium(&self) -> Money {
        self.insurance_premium
    }

    pub fn insurance_coverage(&self) -> Option<&InsuranceCoverage> {
        self.insurance_coverage.as_ref()
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    pub fn payment_mut(&mut self) -> Option<&mut Payment> {
        self.payment.as_mut()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Why the booking failed or was cancelled.
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn compensation_failures(&self) -> &[CompensationFailure] {
        &self.compensation_failures
    }

    /// Returns true if at least one segment exists and every segment is booked.
    pub fn all_segments_booked(&self) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(BookedSegment::is_booked)
    }

    /// Indices of segments still committed with their operators.
    pub fn booked_segment_indices(&self) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_booked())
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns true if the booking is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command methods
impl Booking {
    /// Starts a new pending booking for a passenger on a route.
    pub fn new(route_id: RouteId, passenger: Passenger) -> Self {
        let now = Utc::now();
        Self {
            id: BookingId::new(),
            version: Version::initial(),
            route_id,
            passenger,
            segments: Vec::new(),
            total_price: Money::ZERO,
            total_commission: Money::ZERO,
            grand_total: Money::ZERO,
            include_insurance: false,
            insurance_premium: Money::ZERO,
            insurance_coverage: None,
            status: BookingStatus::Pending,
            payment: None,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            compensation_failures: Vec::new(),
        }
    }

    /// Includes insurance in the booking.
    ///
    /// Pricing is fixed before anything is committed, so this is only allowed
    /// on a pending booking with no segments yet.
    pub fn include_insurance_premium(
        &mut self,
        premium: Money,
        coverage: Option<InsuranceCoverage>,
    ) -> Result<(), DomainError> {
        if !self.status.is_open() || !self.segments.is_empty() {
            return Err(DomainError::InvalidStateTransition {
                current_state: self.status,
                action: "include insurance",
            });
        }

        self.grand_total = self.grand_total - self.insurance_premium + premium;
        self.include_insurance = true;
        self.insurance_premium = premium;
        self.insurance_coverage = coverage;
        self.touch();
        Ok(())
    }

    /// Appends a committed segment and folds its prices into the running totals.
    pub fn add_segment(&mut self, segment: BookedSegment) -> Result<(), DomainError> {
        if !self.status.is_open() {
            return Err(DomainError::InvalidStateTransition {
                current_state: self.status,
                action: "add segment",
            });
        }

        self.total_price += segment.price();
        self.total_commission += segment.commission();
        self.grand_total += segment.total_price();
        self.segments.push(segment);
        self.touch();
        Ok(())
    }

    /// Attaches the booking's single payment.
    pub fn attach_payment(&mut self, payment: Payment) -> Result<(), DomainError> {
        if !self.status.is_open() {
            return Err(DomainError::InvalidStateTransition {
                current_state: self.status,
                action: "attach payment",
            });
        }
        if self.payment.is_some() {
            return Err(DomainError::PaymentAlreadyAttached);
        }

        self.payment = Some(payment);
        self.touch();
        Ok(())
    }

    /// Marks the segment at `index` as rolled back with its operator.
    pub fn mark_segment_cancelled(&mut self, index: usize) -> Result<(), DomainError> {
        let segment = self
            .segments
            .get_mut(index)
            .ok_or(DomainError::SegmentIndexOutOfRange(index))?;
        segment.set_status(SegmentStatus::Cancelled);
        self.touch();
        Ok(())
    }

    /// Records a rollback that failed and flags the segment for follow-up.
    pub fn record_compensation_failure(
        &mut self,
        failure: CompensationFailure,
    ) -> Result<(), DomainError> {
        let segment = self
            .segments
            .get_mut(failure.segment_index)
            .ok_or(DomainError::SegmentIndexOutOfRange(failure.segment_index))?;
        segment.set_status(SegmentStatus::CompensationFailed);
        self.compensation_failures.push(failure);
        self.touch();
        Ok(())
    }

    /// Confirms the booking.
    ///
    /// Requires every segment booked and the payment completed. Returns
    /// `Ok(false)` without touching the confirmation timestamp if the booking
    /// already was confirmed.
    pub fn mark_confirmed(&mut self) -> Result<bool, DomainError> {
        if self.status == BookingStatus::Confirmed {
            return Ok(false);
        }
        if !self.all_segments_booked() {
            return Err(DomainError::ConfirmationPrecondition(
                "not every segment is booked".to_string(),
            ));
        }
        match self.payment.as_ref().map(Payment::status) {
            Some(PaymentStatus::Completed) => {}
            Some(status) => {
                return Err(DomainError::ConfirmationPrecondition(format!(
                    "payment is {status}"
                )));
            }
            None => {
                return Err(DomainError::ConfirmationPrecondition(
                    "no payment attached".to_string(),
                ));
            }
        }

        self.transition(BookingStatus::Confirmed)?;
        self.confirmed_at = Some(self.updated_at);
        Ok(true)
    }

    /// Marks the booking failed with a reason.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<bool, DomainError> {
        if !self.transition(BookingStatus::Failed)? {
            return Ok(false);
        }
        self.cancellation_reason = Some(reason.into());
        Ok(true)
    }

    /// Marks a confirmed booking cancelled with a reason.
    pub fn mark_cancelled(&mut self, reason: impl Into<String>) -> Result<bool, DomainError> {
        if !self.transition(BookingStatus::Cancelled)? {
            return Ok(false);
        }
        self.cancelled_at = Some(self.updated_at);
        self.cancellation_reason = Some(reason.into());
        Ok(true)
    }

    /// Marks the booking refunded.
    pub fn mark_refunded(&mut self) -> Result<bool, DomainError> {
        self.transition(BookingStatus::Refunded)
    }

    fn transition(&mut self, to: BookingStatus) -> Result<bool, DomainError> {
        if self.status == to {
            return Ok(false);
        }
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidBookingTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.touch();
        Ok(true)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
