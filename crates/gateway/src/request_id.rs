//! Request id allocation
//!
//! One generator per connection, handed to the controller at construction.
//! Allocation is a single atomic increment; ids start at 1, are strictly
//! increasing and are never reused for the lifetime of the generator.

use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use tws_core::RequestId;

/// Lock-free source of unique correlation ids
#[derive(Debug)]
pub struct RequestIdGenerator {
    /// Last id handed out (0 before the first allocation)
    last: AtomicU64,
}

impl RequestIdGenerator {
    /// Generator whose first id is 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Generator whose first id is `first` (values below 1 are raised to 1)
    pub fn starting_at(first: u64) -> Self {
        Self {
            last: AtomicU64::new(first.max(1) - 1),
        }
    }

    /// Allocate the next id
    pub fn next(&self) -> RequestId {
        RequestId::new(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Ensure the next allocated id is at least `min_next`
    ///
    /// Used when the gateway announces its next valid order id. Never moves the
    /// counter backwards, so ids already handed out stay unique.
    pub fn advance_to(&self, min_next: RequestId) {
        let floor = min_next.value().saturating_sub(1);
        let previous = self.last.fetch_max(floor, Ordering::Relaxed);
        if previous < floor {
            debug!("Request id counter advanced from {} to {}", previous, floor);
        }
    }

    /// The id the next call to [`next`](Self::next) would return
    pub fn peek(&self) -> RequestId {
        RequestId::new(self.last.load(Ordering::Relaxed) + 1)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
