//! Time source for the currency service.
//!
//! Cooldowns, daily resets and hot-time windows all depend on "now", so the
//! service reads it through this trait instead of calling `Utc::now()` inline.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Source of the current UTC time.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
