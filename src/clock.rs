//! Time source abstraction
//!
//! Session timestamps (creation, last activity, expiry checks) go through an
//! injected clock so tests can advance time deterministically instead of
//! sleeping against the wall clock.

use chrono::{DateTime, Utc};

/// Injectable time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
