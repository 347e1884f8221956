//! Best-effort rollback of committed segments.

use chrono::Utc;
use domain::{Booking, CompensationFailure};
use serde::Serialize;

use crate::services::ProviderRegistry;

/// Outcome of a rollback.
///
/// Every segment the rollback touched is listed exactly once, either as
/// compensated or as failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompensationReport {
    /// Segment indices cancelled with their operator, in rollback order.
    pub compensated: Vec<usize>,
    /// Cancellations that did not go through.
    pub failures: Vec<CompensationFailure>,
}

impl CompensationReport {
    /// Returns true if every attempted cancellation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of cancellations attempted.
    pub fn attempted(&self) -> usize {
        self.compensated.len() + self.failures.len()
    }
}

/// Cancels every segment of `booking` still booked, in reverse commit order.
///
/// A failed cancellation is logged, counted and recorded on the booking, and
/// the loop moves on to the next segment.
pub async fn rollback_segments(
    providers: &ProviderRegistry,
    booking: &mut Booking,
) -> CompensationReport {
    let mut report = CompensationReport::default();
    let booking_id = booking.id();

    for index in booking.booked_segment_indices().into_iter().rev() {
        let segment = &booking.segments()[index];
        let provider = segment.provider().to_string();
        let booking_ref = segment.provider_booking_ref().to_string();

        let result = match providers.get(&provider) {
            Ok(gateway) => gateway.cancel(&booking_ref).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(%booking_id, segment_index = index, %booking_ref, "segment compensated");
                if let Err(e) = booking.mark_segment_cancelled(index) {
                    tracing::error!(%booking_id, segment_index = index, error = %e, "failed to record compensation");
                }
                report.compensated.push(index);
            }
            Err(e) => {
                metrics::counter!("compensation_failures_total").increment(1);
                tracing::error!(
                    %booking_id,
                    segment_index = index,
                    %provider,
                    %booking_ref,
                    error = %e,
                    "segment compensation failed"
                );
                let failure = CompensationFailure {
                    segment_index: index,
                    provider,
                    provider_booking_ref: booking_ref,
                    error: e.to_string(),
                    occurred_at: Utc::now(),
                };
                if let Err(e) = booking.record_compensation_failure(failure.clone()) {
                    tracing::error!(%booking_id, segment_index = index, error = %e, "failed to record compensation failure");
                }
                report.failures.push(failure);
            }
        }
    }

    report
}
