use crate::{
    Config,
    snapshot::Snapshot,
    state::State,
    types::{Clock, Reorderable, Scheduler, Wake},
};
use eyre::Result;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A reorder buffer bound to a host clock and timer.
///
/// Ingestion and timer ticks may come from different threads. Both run
/// under the same lock, so they never interleave on the state.
#[derive(Debug)]
pub struct Partition<T, C, S> {
    state: Mutex<State<T>>,
    clock: C,
    scheduler: S,
}

impl<T, C, S> Partition<T, C, S>
where
    T: Reorderable,
    C: Clock,
    S: Scheduler,
{
    pub fn new(config: Config, clock: C, scheduler: S) -> Result<Self> {
        let state = State::new(config)?;
        Ok(Self::from_state(state, clock, scheduler))
    }

    /// Rebuilds a partition from a snapshot. A wake pending at snapshot
    /// time is requested again.
    pub fn restore<I, F>(
        config: Config,
        clock: C,
        scheduler: S,
        snapshot: Snapshot<I>,
        hydrate: F,
    ) -> Result<Self>
    where
        F: FnMut(I) -> Result<T>,
    {
        let state = State::restore(config, snapshot, hydrate)?;

        let gate = state.schedule();
        if gate.is_enabled()
            && gate.is_armed()
            && let Some(at) = gate.last_scheduled()
        {
            scheduler.request_wake(at);
        }

        Ok(Self::from_state(state, clock, scheduler))
    }

    fn from_state(state: State<T>, clock: C, scheduler: S) -> Self {
        Self {
            state: Mutex::new(state),
            clock,
            scheduler,
        }
    }

    /// Buffers an event and returns the events that became ready, in
    /// timestamp order.
    pub fn ingest(&self, item: T) -> Vec<T> {
        let mut state = self.lock();
        let released = state.ingest(item);

        let wake = state.schedule_on_ingest(self.clock.now());
        self.apply(wake);

        released
    }

    /// Handles a timer wake-up at `now`, returning the events that
    /// timed out.
    pub fn tick(&self, now: i64) -> Vec<T> {
        let mut state = self.lock();
        let released = state.flush_expired(now);

        let wake = state.schedule_on_flush(now);
        self.apply(wake);

        released
    }

    /// Releases everything still buffered and withdraws any pending wake.
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.lock();
        let released = state.drain_all();

        let wake = state.schedule_on_flush(self.clock.now());
        self.apply(wake);

        released
    }

    pub fn snapshot<I, F>(&self, id_of: F) -> Snapshot<I>
    where
        F: FnMut(&T) -> I,
    {
        self.lock().snapshot(id_of)
    }

    /// Runs `f` on the state under the partition lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&State<T>) -> R) -> R {
        f(&self.lock())
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn into_state(self) -> State<T> {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, wake: Wake) {
        match wake {
            Wake::Unchanged => {}
            Wake::Request(at) => self.scheduler.request_wake(at),
            Wake::Cancel => self.scheduler.cancel_wake(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
