use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Millisecond timestamps that never repeat or go backwards within one generator.
#[derive(Debug, Default)]
pub struct TimeOrderedIds {
    last: AtomicI64,
}

impl TimeOrderedIds {
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    pub fn next_at(&self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = millis.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate.to_string(),
                Err(observed) => current = observed,
            }
        }
    }

    pub fn next(&self) -> String {
        self.next_at(Utc::now())
    }
}

static PROCESS_IDS: TimeOrderedIds = TimeOrderedIds::new();

/// Shared generator for accounts and sessions.
pub fn next_id() -> String {
    PROCESS_IDS.next()
}
