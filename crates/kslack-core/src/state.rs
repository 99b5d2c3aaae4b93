use crate::{
    Config,
    buffer::Buffer,
    controller::AlphaController,
    coverage::WindowCoverage,
    schedule::ScheduleGate,
    snapshot::{SNAPSHOT_VERSION, Snapshot},
    types::{Reorderable, Wake},
};
use eyre::{Result, ensure};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// The reordering state of one stream partition.
///
/// New events land in the primary buffer. Whenever an event raises the
/// largest timestamp seen, the primary buffer is merged into the
/// secondary one and every secondary timestamp at least `k` behind the
/// largest timestamp is released.
#[derive(Debug)]
pub struct State<T> {
    config: Config,

    /// Events ingested since the last merge.
    primary: Buffer<T>,

    /// Events waiting for the window to pass them.
    secondary: Buffer<T>,

    /// The K-Slack window size.
    k: i64,

    /// The window the runtime coverage is measured against. Updated
    /// together with alpha at batch boundaries.
    coverage_window: i64,

    controller: AlphaController,
    coverage: WindowCoverage,
    schedule: ScheduleGate,

    largest_timestamp: Option<i64>,

    /// Marks the largest timestamp that has been released.
    last_emitted: Option<i64>,

    correlations: VecDeque<f64>,
    timestamps: VecDeque<i64>,
    batch_counter: u64,
}

impl<T> State<T> {
    /// Validates the configuration and creates an empty state.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let coverage = WindowCoverage::new(config.error_threshold, config.confidence_level);
        let schedule = ScheduleGate::new(config.timeout, config.wake_interval);
        let capacity = sample_capacity(&config);

        Ok(Self {
            primary: Buffer::new(),
            secondary: Buffer::new(),
            k: 0,
            coverage_window: 0,
            controller: AlphaController::new(),
            coverage,
            schedule,
            largest_timestamp: None,
            last_emitted: None,
            correlations: VecDeque::with_capacity(capacity),
            timestamps: VecDeque::with_capacity(capacity),
            batch_counter: 0,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current K-Slack window size.
    pub fn k(&self) -> i64 {
        self.k
    }

    pub fn alpha(&self) -> f64 {
        self.controller.alpha()
    }

    pub fn coverage_window(&self) -> i64 {
        self.coverage_window
    }

    pub fn largest_timestamp(&self) -> Option<i64> {
        self.largest_timestamp
    }

    pub fn last_emitted(&self) -> Option<i64> {
        self.last_emitted
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }

    /// Events buffered since the last event that raised the largest
    /// timestamp.
    pub fn primary_len(&self) -> usize {
        self.primary.len()
    }

    pub fn secondary_len(&self) -> usize {
        self.secondary.len()
    }

    /// Events counted toward the next alpha recomputation.
    pub fn batch_counter(&self) -> u64 {
        self.batch_counter
    }

    pub fn correlation_sample_len(&self) -> usize {
        self.correlations.len()
    }

    pub fn timestamp_sample_len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn schedule(&self) -> &ScheduleGate {
        &self.schedule
    }

    /// Releases every event buffered before `now - timeout`, ignoring the
    /// window. Does nothing when no timeout is configured.
    pub fn flush_expired(&mut self, now: i64) -> Vec<T> {
        let Some(timeout) = self.config.timeout else {
            return Vec::new();
        };
        let cutoff = now.saturating_sub(timeout);

        let mut expired = self.secondary.split_before(cutoff);
        let mut late = self.primary.split_before(cutoff);
        expired.merge_from(&mut late);

        let mut released = Vec::with_capacity(expired.len());
        let last = expired.drain_all(&mut released);
        self.advance_last_emitted(last);

        if !released.is_empty() {
            debug!(
                now,
                cutoff,
                count = released.len(),
                remaining = self.len(),
                "flush expired events"
            );
        }

        released
    }

    /// Releases everything still buffered, in timestamp order.
    pub fn drain_all(&mut self) -> Vec<T> {
        self.secondary.merge_from(&mut self.primary);

        let mut released = Vec::with_capacity(self.secondary.len());
        let last = self.secondary.drain_all(&mut released);
        self.advance_last_emitted(last);
        released
    }

    /// Tells the schedule gate that an event was ingested at `now`.
    pub fn schedule_on_ingest(&mut self, now: i64) -> Wake {
        if self.is_empty() {
            return Wake::Unchanged;
        }
        self.schedule.on_ingest(now)
    }

    /// Tells the schedule gate that a timeout flush ran at `now`.
    pub fn schedule_on_flush(&mut self, now: i64) -> Wake {
        let remaining = !self.is_empty();
        self.schedule.on_flush(now, remaining)
    }

    /// Records the state, mapping each buffered event to an id.
    pub fn snapshot<I, F>(&self, mut id_of: F) -> Snapshot<I>
    where
        F: FnMut(&T) -> I,
    {
        Snapshot {
            version: SNAPSHOT_VERSION,
            primary: ids_of(&self.primary, &mut id_of),
            secondary: ids_of(&self.secondary, &mut id_of),
            k: self.k,
            coverage_window: self.coverage_window,
            alpha: self.controller.alpha(),
            previous_alpha: self.controller.previous_alpha(),
            previous_error: self.controller.previous_error(),
            largest_timestamp: self.largest_timestamp,
            last_emitted: self.last_emitted,
            schedule: self.schedule.state(),
            correlations: self.correlations.iter().copied().collect(),
            timestamps: self.timestamps.iter().copied().collect(),
            batch_counter: self.batch_counter,
        }
    }

    /// Rebuilds a state from a snapshot, turning ids back into events
    /// with `hydrate`.
    pub fn restore<I, F>(config: Config, snapshot: Snapshot<I>, mut hydrate: F) -> Result<Self>
    where
        F: FnMut(I) -> Result<T>,
    {
        ensure!(
            snapshot.version == SNAPSHOT_VERSION,
            "unsupported snapshot version {}, expect {SNAPSHOT_VERSION}",
            snapshot.version
        );

        let mut state = Self::new(config)?;
        let max_k = state.config.max_k_or_unbounded();
        ensure!(
            (0..=max_k).contains(&snapshot.k),
            "snapshot k {} is outside [0, {max_k}]",
            snapshot.k
        );
        ensure!(
            (0..=snapshot.k).contains(&snapshot.coverage_window),
            "snapshot coverage window {} is outside [0, {}]",
            snapshot.coverage_window,
            snapshot.k
        );
        ensure!(
            snapshot.alpha.is_finite() && snapshot.alpha >= 0.0,
            "snapshot alpha must be a non-negative number, got {}",
            snapshot.alpha
        );
        ensure!(
            snapshot.previous_alpha.is_finite() && snapshot.previous_alpha >= 0.0,
            "snapshot previous alpha must be a non-negative number, got {}",
            snapshot.previous_alpha
        );
        ensure!(
            snapshot.previous_error.is_finite(),
            "snapshot previous error must be finite, got {}",
            snapshot.previous_error
        );

        for (timestamp, ids) in snapshot.primary {
            for id in ids {
                state.primary.push(timestamp, hydrate(id)?);
            }
        }
        for (timestamp, ids) in snapshot.secondary {
            for id in ids {
                state.secondary.push(timestamp, hydrate(id)?);
            }
        }

        state.k = snapshot.k;
        state.coverage_window = snapshot.coverage_window;
        state.controller = AlphaController::from_parts(
            snapshot.alpha,
            snapshot.previous_alpha,
            snapshot.previous_error,
        );
        state.largest_timestamp = snapshot.largest_timestamp;
        state.last_emitted = snapshot.last_emitted;
        state.schedule.restore(snapshot.schedule);
        state.batch_counter = snapshot.batch_counter;

        let capacity = sample_capacity(&state.config);
        state.correlations.extend(snapshot.correlations);
        state.timestamps.extend(snapshot.timestamps);
        truncate_front(&mut state.correlations, capacity);
        truncate_front(&mut state.timestamps, capacity);

        Ok(state)
    }

    fn advance_last_emitted(&mut self, released: Option<i64>) {
        if let Some(ts) = released {
            self.last_emitted = Some(self.last_emitted.map_or(ts, |last| last.max(ts)));
        }
    }
}

impl<T> State<T>
where
    T: Reorderable,
{
    /// Buffers an event and returns the events that became ready.
    pub fn ingest(&mut self, item: T) -> Vec<T> {
        let timestamp = item.timestamp();
        self.record_sample(timestamp, item.correlation());

        if self.config.discard_late_arrivals
            && let Some(last_emitted) = self.last_emitted
            && timestamp < last_emitted
        {
            debug!(timestamp, last_emitted, "drop a late event");
            return Vec::new();
        }

        self.primary.push(timestamp, item);

        self.batch_counter += 1;
        if self.batch_counter > self.config.batch_size {
            self.recompute_alpha(timestamp);
        }

        // Late events wait in the primary buffer until the largest
        // timestamp moves again.
        if self
            .largest_timestamp
            .is_some_and(|largest| timestamp <= largest)
        {
            return Vec::new();
        }

        self.largest_timestamp = Some(timestamp);
        self.grow_window(timestamp);
        self.secondary.merge_from(&mut self.primary);

        let k = self.k;
        let mut released = Vec::new();
        let last = self
            .secondary
            .drain_while(&mut released, |key| key.saturating_add(k) <= timestamp);
        self.advance_last_emitted(last);

        released
    }

    fn record_sample(&mut self, timestamp: i64, correlation: f64) {
        let capacity = sample_capacity(&self.config);

        self.timestamps.push_back(timestamp);
        self.correlations.push_back(correlation);
        truncate_front(&mut self.timestamps, capacity);
        truncate_front(&mut self.correlations, capacity);
    }

    /// Updates alpha and the coverage window. `k` is left for the next
    /// event that raises the largest timestamp.
    fn recompute_alpha(&mut self, timestamp: i64) {
        let threshold = self.coverage.threshold(&self.correlations);
        let runtime = if self.coverage_window == 0 {
            1.0
        } else {
            self.coverage.runtime_coverage(
                timestamp,
                &self.timestamps,
                self.coverage_window,
                self.config.coverage_span,
            )
        };

        let alpha = self.controller.update(threshold, runtime);
        self.coverage_window = ((alpha * self.k as f64).round() as i64).min(self.k);

        debug!(
            threshold,
            runtime, alpha, coverage_window = self.coverage_window, "recompute alpha"
        );

        self.batch_counter = 0;
        self.correlations.clear();
    }

    /// Widens the window when the disorder in the primary buffer exceeds
    /// it.
    fn grow_window(&mut self, largest: i64) {
        let Some(min_ts) = self.primary.first_key() else {
            return;
        };

        let diff = largest.saturating_sub(min_ts);
        if diff <= self.k {
            return;
        }

        let max_k = self.config.max_k_or_unbounded();
        let k = if diff >= max_k {
            max_k
        } else {
            ((diff as f64 * self.controller.alpha()).round() as i64).clamp(0, max_k)
        };

        debug!(diff, previous_k = self.k, k, "update window size");
        self.k = k;
    }
}

fn sample_capacity(config: &Config) -> usize {
    usize::try_from(config.batch_size).unwrap_or(usize::MAX)
}

fn truncate_front<V>(sample: &mut VecDeque<V>, capacity: usize) {
    while sample.len() > capacity {
        sample.pop_front();
    }
}

fn ids_of<T, I, F>(buffer: &Buffer<T>, id_of: &mut F) -> BTreeMap<i64, Vec<I>>
where
    F: FnMut(&T) -> I,
{
    buffer
        .iter()
        .map(|(timestamp, items)| (timestamp, items.iter().map(&mut *id_of).collect()))
        .collect()
}
