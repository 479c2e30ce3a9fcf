//! Session time for the feed loop, injected instead of read ambiently so
//! the loop can be exercised with a fixed clock in tests.

use std::time::Instant;

/// Source of timestamps for published samples.
pub trait Clock: Send {
    /// Seconds since the start of the session.
    fn now(&self) -> f64;
}

/// Monotonic clock zeroed when the device starts acquiring.
#[derive(Debug, Clone)]
pub struct SessionClock {
    epoch: Instant,
}

impl SessionClock {
    /// Starts the session clock at zero.
    pub fn new() -> Self {
        SessionClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SessionClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}
