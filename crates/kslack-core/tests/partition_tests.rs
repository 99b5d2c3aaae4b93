mod common;

use common::*;
use kslack_core::{Config, Partition};
use std::{collections::HashSet, thread};

type TestPartition<'a> = Partition<TestEvent, &'a ManualClock, &'a RecordingScheduler>;

fn create_partition<'a>(
    config: Config,
    clock: &'a ManualClock,
    scheduler: &'a RecordingScheduler,
) -> TestPartition<'a> {
    Partition::new(config, clock, scheduler).unwrap()
}

fn ingest_all(partition: &TestPartition<'_>, events: Vec<TestEvent>) -> Vec<TestEvent> {
    events
        .into_iter()
        .flat_map(|event| partition.ingest(event))
        .collect()
}

#[test]
fn test_timeout_ticks_release_stragglers() {
    let clock = ManualClock::at(110);
    let scheduler = RecordingScheduler::default();
    let config = Config::with_batch_size(20).with_max_k(100).with_timeout(1000);
    let partition = create_partition(config, &clock, &scheduler);

    let released = ingest_all(&partition, create_events(&[100, 105, 102, 150, 101]));
    assert_eq!(timestamps_of(&released), vec![100, 105, 102]);

    // Armed once, when 102 became the first buffered event.
    assert_eq!(scheduler.calls(), vec![WakeCall::Request(1110)]);

    // cutoff = 110: 101 expired, 150 has not
    let flushed = partition.tick(1110);
    assert_eq!(timestamps_of(&flushed), vec![101]);
    assert_eq!(scheduler.pending(), Some(2110));

    // cutoff = 1110
    let flushed = partition.tick(2110);
    assert_eq!(timestamps_of(&flushed), vec![150]);
    assert_eq!(
        scheduler.calls(),
        vec![
            WakeCall::Request(1110),
            WakeCall::Request(2110),
            WakeCall::Cancel
        ]
    );
    assert!(partition.inspect(|state| state.is_empty()));
}

#[test]
fn test_late_tick_flushes_everything_expired() {
    let clock = ManualClock::at(110);
    let scheduler = RecordingScheduler::default();
    let config = Config::with_batch_size(20).with_max_k(100).with_timeout(1000);
    let partition = create_partition(config, &clock, &scheduler);

    ingest_all(&partition, create_events(&[100, 105, 102, 150, 101]));

    let flushed = partition.tick(2000);
    assert_eq!(timestamps_of(&flushed), vec![101, 150]);
    assert_eq!(scheduler.calls().last(), Some(&WakeCall::Cancel));
    assert_eq!(partition.inspect(|state| state.last_emitted()), Some(150));
}

#[test]
fn test_timeout_ignores_window_size() {
    let clock = ManualClock::at(6000);
    let scheduler = RecordingScheduler::default();
    let config = Config::with_batch_size(20).with_timeout(1000);
    let partition = create_partition(config, &clock, &scheduler);

    let released = ingest_all(&partition, create_events(&[1000, 5000, 1200, 6000, 5500, 5900]));
    assert_eq!(timestamps_of(&released), vec![1000, 5000, 1200]);
    assert_eq!(partition.inspect(|state| state.k()), 4800);
    assert_eq!(scheduler.calls(), vec![WakeCall::Request(7000)]);

    // cutoff = 6000 is exclusive
    let flushed = partition.tick(7000);
    assert_eq!(timestamps_of(&flushed), vec![5500, 5900]);
    assert_eq!(scheduler.pending(), Some(8000));

    let flushed = partition.tick(8000);
    assert_eq!(timestamps_of(&flushed), vec![6000]);
    assert_eq!(scheduler.calls().last(), Some(&WakeCall::Cancel));
}

#[test]
fn test_ingest_rearms_after_cancel() {
    let clock = ManualClock::at(110);
    let scheduler = RecordingScheduler::default();
    let config = Config::with_batch_size(20).with_max_k(100).with_timeout(1000);
    let partition = create_partition(config, &clock, &scheduler);

    ingest_all(&partition, create_events(&[100, 105, 102, 150, 101]));
    partition.tick(2000);
    assert_eq!(scheduler.pending(), None);

    // k = 48 holds the new maximum back.
    clock.set(3000);
    let released = partition.ingest(TestEvent::new(3000, 10.0, 5));
    assert!(released.is_empty());
    assert_eq!(scheduler.pending(), Some(4000));
}

#[test]
fn test_no_timeout_no_scheduler_calls() {
    let clock = ManualClock::at(0);
    let scheduler = RecordingScheduler::default();
    let partition = create_partition(Config::with_batch_size(20).with_max_k(100), &clock, &scheduler);

    ingest_all(&partition, create_events(&[100, 105, 102, 150, 101]));
    assert!(partition.tick(1_000_000).is_empty());
    assert!(scheduler.calls().is_empty());
    assert_eq!(partition.inspect(|state| state.len()), 2);
}

#[test]
fn test_drain_releases_and_cancels() {
    let clock = ManualClock::at(110);
    let scheduler = RecordingScheduler::default();
    let config = Config::with_batch_size(20).with_max_k(100).with_timeout(1000);
    let partition = create_partition(config, &clock, &scheduler);

    ingest_all(&partition, create_events(&[100, 105, 102, 150, 101]));

    let drained = partition.drain();
    assert_eq!(timestamps_of(&drained), vec![101, 150]);
    assert_eq!(scheduler.pending(), None);

    let state = partition.into_state();
    assert!(state.is_empty());
    assert!(!state.schedule().is_armed());
}

#[test]
fn test_concurrent_ingest_and_tick() {
    let clock = ManualClock::at(0);
    let scheduler = RecordingScheduler::default();
    let config = Config::with_batch_size(50).with_max_k(500).with_timeout(100);
    let partition = create_partition(config, &clock, &scheduler);

    let timestamps: Vec<i64> = (0..2000).map(|i| i * 3 - (i % 7) * 40).collect();
    let events = create_events(&timestamps);
    let total = events.len();

    let mut released: Vec<TestEvent> = thread::scope(|scope| {
        let producer = scope.spawn(|| ingest_all(&partition, events));
        let ticker = scope.spawn(|| {
            (0..200)
                .flat_map(|round| partition.tick(round * 50))
                .collect::<Vec<_>>()
        });

        let mut released = producer.join().unwrap();
        released.extend(ticker.join().unwrap());
        released
    });
    released.extend(partition.drain());

    let ids: HashSet<usize> = released.iter().map(|event| event.id).collect();
    assert_eq!(released.len(), total);
    assert_eq!(ids.len(), total);
}
