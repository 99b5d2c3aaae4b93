use crate::types::Clock;
use chrono::Utc;
use std::time::Duration;

/// Wall-clock milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn duration_until(&self, at: i64) -> Duration {
        millis_until(self.now(), at)
    }
}

/// Milliseconds on the tokio clock, counted from `origin` at creation.
///
/// Follows tokio's paused time in tests.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    start: tokio::time::Instant,
    origin: i64,
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

impl TokioClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that reads `origin` right now.
    pub fn starting_at(origin: i64) -> Self {
        Self {
            start: tokio::time::Instant::now(),
            origin,
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> i64 {
        let elapsed = i64::try_from(self.start.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.origin.saturating_add(elapsed)
    }

    fn duration_until(&self, at: i64) -> Duration {
        millis_until(self.now(), at)
    }
}

fn millis_until(now: i64, at: i64) -> Duration {
    let millis = at.saturating_sub(now).max(0);
    Duration::from_millis(millis as u64)
}
