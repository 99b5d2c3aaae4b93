use kslack_core::{Clock, Reorderable, Scheduler};
use std::{
    sync::{
        Mutex,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TestEvent {
    pub timestamp: i64,
    pub value: f64,
    pub id: usize,
}

impl TestEvent {
    pub fn new(timestamp: i64, value: f64, id: usize) -> Self {
        Self {
            timestamp,
            value,
            id,
        }
    }
}

impl Reorderable for TestEvent {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn correlation(&self) -> f64 {
        self.value
    }
}

/// Events with the given timestamps, numbered in arrival order.
#[allow(dead_code)]
pub fn create_events(timestamps: &[i64]) -> Vec<TestEvent> {
    timestamps
        .iter()
        .enumerate()
        .map(|(id, &ts)| TestEvent::new(ts, 10.0, id))
        .collect()
}

#[allow(dead_code)]
pub fn timestamps_of(events: &[TestEvent]) -> Vec<i64> {
    events.iter().map(|event| event.timestamp).collect()
}

/// A clock that only moves when told to.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for &ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn duration_until(&self, at: i64) -> Duration {
        Duration::from_millis(at.saturating_sub(self.now()).max(0) as u64)
    }
}

/// Wake-up calls made by a partition.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCall {
    Request(i64),
    Cancel,
}

/// A scheduler that records every call.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    calls: Mutex<Vec<WakeCall>>,
}

#[allow(dead_code)]
impl RecordingScheduler {
    pub fn calls(&self) -> Vec<WakeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The wake time a host timer would currently be armed for.
    pub fn pending(&self) -> Option<i64> {
        match self.calls.lock().unwrap().last() {
            Some(WakeCall::Request(at)) => Some(*at),
            _ => None,
        }
    }
}

impl Scheduler for &RecordingScheduler {
    fn request_wake(&self, at: i64) {
        self.calls.lock().unwrap().push(WakeCall::Request(at));
    }

    fn cancel_wake(&self) {
        self.calls.lock().unwrap().push(WakeCall::Cancel);
    }
}

/// Assert that every batch is in timestamp order and keeps arrival
/// order within a timestamp.
#[allow(dead_code)]
pub fn assert_batch_ordered(batch: &[TestEvent]) {
    for pair in batch.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(
            prev.timestamp < next.timestamp
                || (prev.timestamp == next.timestamp && prev.id < next.id),
            "Batch out of order: {:?} before {:?}",
            prev,
            next
        );
    }
}

/// Assert that a whole output sequence is non-decreasing in timestamp.
#[allow(dead_code)]
pub fn assert_timestamp_ordering(events: &[TestEvent]) {
    let mut prev: Option<i64> = None;

    for event in events {
        if let Some(prev) = prev {
            assert!(
                event.timestamp >= prev,
                "Events not in timestamp order: prev={}, current={}",
                prev,
                event.timestamp
            );
        }
        prev = Some(event.timestamp);
    }
}
