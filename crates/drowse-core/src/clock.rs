//! Millisecond clock shared by a registry and its samplers.

use tokio::time::Instant;

/// Monotonic milliseconds since the clock was created.
///
/// Built on `tokio::time::Instant`, so it follows tokio's paused test clock.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
