//! Segments committed with an operator.

use chrono::{DateTime, FixedOffset, Utc};
use common::SegmentId;
use serde::{Deserialize, Serialize};

use super::Money;
use crate::route::{Segment, Stop, TransportType};

/// Per-segment booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    /// Committed with the operator.
    Booked,
    /// Rolled back with the operator.
    Cancelled,
    /// Rollback was attempted and failed; needs manual follow-up.
    CompensationFailed,
}

impl SegmentStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStatus::Booked => "booked",
            SegmentStatus::Cancelled => "cancelled",
            SegmentStatus::CompensationFailed => "compensation_failed",
        }
    }
}

impl std::fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A segment committed with its operator, with the price actually charged.
///
/// `total_price` always equals `price + commission`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSegment {
    segment_id: SegmentId,
    provider: String,
    transport_type: TransportType,
    from: Stop,
    to: Stop,
    departure: DateTime<FixedOffset>,
    arrival: DateTime<FixedOffset>,
    ticket_number: String,
    provider_booking_ref: String,
    price: Money,
    commission: Money,
    total_price: Money,
    status: SegmentStatus,
}

impl BookedSegment {
    /// Records a successful operator booking of `segment`.
    pub fn new(
        segment: &Segment,
        ticket_number: impl Into<String>,
        provider_booking_ref: impl Into<String>,
        commission: Money,
    ) -> Self {
        Self {
            segment_id: segment.id.clone(),
            provider: segment.provider.clone(),
            transport_type: segment.transport_type.clone(),
            from: segment.from.clone(),
            to: segment.to.clone(),
            departure: segment.departure,
            arrival: segment.arrival,
            ticket_number: ticket_number.into(),
            provider_booking_ref: provider_booking_ref.into(),
            price: segment.price,
            commission,
            total_price: segment.price + commission,
            status: SegmentStatus::Booked,
        }
    }

    pub fn segment_id(&self) -> &SegmentId {
        &self.segment_id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn transport_type(&self) -> &TransportType {
        &self.transport_type
    }

    pub fn origin(&self) -> &Stop {
        &self.from
    }

    pub fn destination(&self) -> &Stop {
        &self.to
    }

    pub fn departure(&self) -> DateTime<FixedOffset> {
        self.departure
    }

    pub fn arrival(&self) -> DateTime<FixedOffset> {
        self.arrival
    }

    pub fn ticket_number(&self) -> &str {
        &self.ticket_number
    }

    /// Operator reference needed to cancel this booking.
    pub fn provider_booking_ref(&self) -> &str {
        &self.provider_booking_ref
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn commission(&self) -> Money {
        self.commission
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn status(&self) -> SegmentStatus {
        self.status
    }

    pub fn is_booked(&self) -> bool {
        self.status == SegmentStatus::Booked
    }

    pub(crate) fn set_status(&mut self, status: SegmentStatus) {
        self.status = status;
    }
}

/// A rollback that could not be completed, kept for operational follow-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationFailure {
    /// Position of the segment in the route.
    pub segment_index: usize,
    pub provider: String,
    pub provider_booking_ref: String,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}
