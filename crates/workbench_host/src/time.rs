//! Time and write-ordering helpers shared across store adapters.

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

thread_local! {
    static LAST_ENVELOPE_TIMESTAMP_MS: Cell<u64> = const { Cell::new(0) };
    static LAST_WRITE_SEQUENCE: Cell<u64> = const { Cell::new(0) };
}

/// Returns the current unix timestamp in milliseconds.
pub fn unix_time_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Returns a monotonic unix millisecond timestamp for envelope updates.
///
/// Values are monotonic within the current thread even when the system clock does not advance.
pub fn next_monotonic_timestamp_ms() -> u64 {
    let now = unix_time_ms_now();
    LAST_ENVELOPE_TIMESTAMP_MS.with(|last| {
        let next = now.max(last.get().saturating_add(1));
        last.set(next);
        next
    })
}

/// Issue-order stamp attached to a store write.
///
/// Stamps are taken when a write is issued, not when its future is polled, so a backend can keep
/// same-key writes in issuer order even if their futures complete out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WriteSequence(u64);

impl WriteSequence {
    /// Issues the next sequence number for the owner thread.
    pub fn next() -> Self {
        LAST_WRITE_SEQUENCE.with(|last| {
            let next = last.get().saturating_add(1);
            last.set(next);
            Self(next)
        })
    }

    /// Returns the raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}
