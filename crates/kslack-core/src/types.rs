use eyre::Result;
use futures::stream::BoxStream;
use std::time::Duration;

/// Extracts the ordering key and the correlation value from an event
/// passed to the reorder buffer.
pub trait Reorderable: Send {
    /// The timestamp the stream is ordered on. The unit is up to the
    /// caller but must match the [Clock] when a timeout is configured.
    fn timestamp(&self) -> i64;

    /// The numeric attribute whose dispersion drives the window
    /// coverage target.
    fn correlation(&self) -> f64;
}

/// A monotonic time source in the same unit as event timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;

    /// Real time left until the clock reads `at`. Zero if `at` has
    /// already passed.
    fn duration_until(&self, at: i64) -> Duration;
}

/// The host timer that delivers [Partition::tick](crate::Partition::tick)
/// calls.
pub trait Scheduler: Send + Sync {
    /// Requests a tick at or after `at`. A later request replaces an
    /// earlier one.
    fn request_wake(&self, at: i64);

    /// Withdraws the pending wake request, if any.
    fn cancel_wake(&self);
}

/// A scheduling decision produced by the [ScheduleGate](crate::ScheduleGate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Leave the current wake request as it is.
    Unchanged,
    /// Request a wake at the given time.
    Request(i64),
    /// Nothing is buffered; drop the pending wake request.
    Cancel,
}

/// The stream returned by [reorder](crate::reorder()), emitting events
/// in timestamp order.
pub type OutputStream<'a, T> = BoxStream<'a, Result<T>>;
