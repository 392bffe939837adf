//! Injected environment dependencies.
//!
//! Time is the only ambient dependency the engine needs; abstracting it
//! keeps window and expiry rules deterministic under test.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// Production uses [`SystemClock`]; tests use a fixed, settable clock so
/// voting-window and order-expiry rules can be exercised at exact instants.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// System clock backed by the OS
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
