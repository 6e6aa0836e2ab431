//! Wall-clock deadline for a coordinator run
//!
//! The deadline only reports expiry. The coordinator decides what to do
//! about it: it routes through the ordinary cancel path so an expired run
//! is cancelled on the service rather than abandoned.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic time
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin
    fn elapsed(&self) -> Duration;
}

/// Clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand, for tests
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

/// Deadline measured from construction
pub struct Deadline {
    limit: Duration,
    started: Duration,
    clock: Arc<dyn Clock>,
}

impl Deadline {
    /// Deadline `limit` after now, measured by `clock`
    pub fn new(limit: Duration, clock: Arc<dyn Clock>) -> Self {
        let started = clock.elapsed();
        Self {
            limit,
            started,
            clock,
        }
    }

    /// Deadline measured by the system clock
    pub fn after(limit: Duration) -> Self {
        Self::new(limit, Arc::new(SystemClock::new()))
    }

    /// Configured limit
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Time since the deadline was set
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed().saturating_sub(self.started)
    }

    /// Time left before expiry
    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    /// True once the limit has been reached
    pub fn expired(&self) -> bool {
        self.elapsed() >= self.limit
    }
}

impl fmt::Debug for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deadline")
            .field("limit", &self.limit)
            .field("elapsed", &self.elapsed())
            .finish()
    }
}
