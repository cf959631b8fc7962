//! Time access behind a port.
//!
//! Run ids, started/ended timestamps and runtime bookkeeping all go
//! through [`Clock`] so that session tests can pin the instant instead
//! of sampling the wall clock.

use chrono::{DateTime, Utc};

/// Source of timestamps for runs.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock, used outside of tests.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
