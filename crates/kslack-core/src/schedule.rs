use crate::types::Wake;
use serde::{Deserialize, Serialize};

/// Decides when the next timeout tick must fire.
///
/// The gate never flushes anything itself. It arms a wake-up when the
/// first event is buffered, keeps stepping it forward by `interval`
/// while events remain buffered and disarms once a flush drains
/// everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleGate {
    timeout: Option<i64>,
    interval: i64,
    state: GateState,
}

/// The persisted part of a [ScheduleGate].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    /// The most recently requested wake time.
    pub last_scheduled: Option<i64>,
    /// Whether a wake request is pending.
    pub armed: bool,
}

impl ScheduleGate {
    pub fn new(timeout: Option<i64>, interval: i64) -> Self {
        Self {
            timeout,
            interval,
            state: GateState::default(),
        }
    }

    pub(crate) fn restore(&mut self, state: GateState) {
        self.state = state;
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.timeout.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed
    }

    pub fn last_scheduled(&self) -> Option<i64> {
        self.state.last_scheduled
    }

    /// Called after an event has been buffered at wall-clock time `now`.
    pub fn on_ingest(&mut self, now: i64) -> Wake {
        let Some(timeout) = self.timeout else {
            return Wake::Unchanged;
        };

        if self.state.armed {
            return Wake::Unchanged;
        }

        let at = now.saturating_add(timeout);
        self.state = GateState {
            last_scheduled: Some(at),
            armed: true,
        };
        Wake::Request(at)
    }

    /// Called after a timeout flush at wall-clock time `now`.
    /// `remaining` tells whether anything is still buffered.
    pub fn on_flush(&mut self, now: i64, remaining: bool) -> Wake {
        if self.timeout.is_none() {
            return Wake::Unchanged;
        }

        if !remaining {
            self.state.armed = false;
            return Wake::Cancel;
        }

        let base = self.state.last_scheduled.unwrap_or(now);
        let mut next = base.saturating_add(self.interval);

        // Skip the ticks a late host has already missed.
        if next <= now {
            let missed = (now - base) / self.interval + 1;
            next = base.saturating_add(missed.saturating_mul(self.interval));
        }

        self.state = GateState {
            last_scheduled: Some(next),
            armed: true,
        };
        Wake::Request(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_gate_never_schedules() {
        let mut gate = ScheduleGate::new(None, 1000);
        assert!(!gate.is_enabled());
        assert_eq!(gate.on_ingest(0), Wake::Unchanged);
        assert_eq!(gate.on_flush(0, true), Wake::Unchanged);
        assert!(!gate.is_armed());
    }

    #[test]
    fn test_first_ingest_arms_once() {
        let mut gate = ScheduleGate::new(Some(500), 1000);

        assert_eq!(gate.on_ingest(100), Wake::Request(600));
        assert!(gate.is_armed());
        assert_eq!(gate.on_ingest(200), Wake::Unchanged);
        assert_eq!(gate.last_scheduled(), Some(600));
    }

    #[test]
    fn test_flush_with_remaining_steps_by_interval() {
        let mut gate = ScheduleGate::new(Some(500), 1000);
        gate.on_ingest(100);

        assert_eq!(gate.on_flush(600, true), Wake::Request(1600));
        assert_eq!(gate.on_flush(1600, true), Wake::Request(2600));
    }

    #[test]
    fn test_flush_skips_missed_ticks() {
        let mut gate = ScheduleGate::new(Some(500), 1000);
        gate.on_ingest(100);

        // The host ticked 3.5 intervals late.
        assert_eq!(gate.on_flush(4100, true), Wake::Request(4600));
        // Exactly on a grid point still moves forward.
        assert_eq!(gate.on_flush(5600, true), Wake::Request(6600));
    }

    #[test]
    fn test_drained_flush_disarms_until_next_ingest() {
        let mut gate = ScheduleGate::new(Some(500), 1000);
        gate.on_ingest(100);

        assert_eq!(gate.on_flush(600, false), Wake::Cancel);
        assert!(!gate.is_armed());

        assert_eq!(gate.on_ingest(5000), Wake::Request(5500));
    }
}
