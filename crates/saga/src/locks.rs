//! Per-booking mutual exclusion for operations that call external gateways.

use std::collections::HashMap;
use std::sync::Arc;

use common::BookingId;
use tokio::sync::Mutex;

/// Serializes gateway-side work on the same booking within one process.
///
/// A caller holds the booking's lock across the read, the gateway calls and
/// the write, so a second caller only sees the stored result.
#[derive(Debug, Default)]
pub struct BookingLocks {
    locks: Mutex<HashMap<BookingId, Arc<Mutex<()>>>>,
}

impl BookingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `booking_id`, creating it if needed.
    pub async fn acquire(&self, booking_id: BookingId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(booking_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the entry for `booking_id` once no other caller holds it.
    pub async fn release(&self, booking_id: BookingId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // one reference in the map, one here
        if let Some(existing) = locks.get(&booking_id)
            && Arc::ptr_eq(existing, &lock)
            && Arc::strong_count(&lock) == 2
        {
            locks.remove(&booking_id);
        }
    }

    /// Number of bookings with a live lock entry.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
