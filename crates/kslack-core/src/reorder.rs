use crate::{
    Config,
    state::State,
    types::{Clock, OutputStream, Reorderable, Wake},
};
use eyre::Result;
use futures::{
    StreamExt,
    stream::{self, Stream},
};
use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll, Poll::*},
};
use tokio::time::{Sleep, sleep};
use tracing::debug;

/// Consume a stream of out-of-order events and emit them in timestamp
/// order.
///
/// Events are released as soon as the adaptive window passes them. When
/// a timeout is configured, a tokio timer flushes events that stayed
/// longer than the timeout according to `clock`; this requires a tokio
/// runtime with the time driver enabled. When the input ends, everything
/// still buffered is released in order. An error from the input stream
/// is forwarded and ends the input.
pub fn reorder<'a, T, S, C>(stream: S, config: Config, clock: C) -> Result<OutputStream<'a, T>>
where
    T: Reorderable + 'a,
    S: Stream<Item = Result<T>> + Unpin + Send + 'a,
    C: Clock + 'a,
{
    let state = State::new(config)?;

    let mut driver = Driver {
        input: Some(stream),
        state,
        clock,
        pending: VecDeque::new(),
        timer: None,
    };

    // Construct output stream.
    let output_stream = stream::poll_fn(move |ctx| driver.poll(ctx));

    Ok(output_stream.boxed())
}

/// The state owned by the output stream of [reorder].
struct Driver<T, S, C> {
    input: Option<S>,
    state: State<T>,
    clock: C,

    /// Released events not yet handed to the consumer.
    pending: VecDeque<T>,

    /// The next timeout tick.
    timer: Option<Pin<Box<Sleep>>>,
}

impl<T, S, C> Driver<T, S, C>
where
    T: Reorderable,
    S: Stream<Item = Result<T>> + Unpin,
    C: Clock,
{
    fn poll(&mut self, ctx: &mut Context<'_>) -> Poll<Option<Result<T>>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ready(Some(Ok(item)));
            }

            if self.input.is_none() {
                // Case: the input stream is depleted and everything has
                // been handed out.
                return Ready(None);
            }

            if let Some(timer) = self.timer.as_mut()
                && timer.as_mut().poll(ctx).is_ready()
            {
                self.timer = None;

                let now = self.clock.now();
                let released = self.state.flush_expired(now);
                self.pending.extend(released);

                let wake = self.state.schedule_on_flush(now);
                self.apply(wake);
                continue;
            }

            let Some(input) = self.input.as_mut() else {
                return Ready(None);
            };

            match input.poll_next_unpin(ctx) {
                Ready(Some(Ok(item))) => {
                    let released = self.state.ingest(item);
                    self.pending.extend(released);

                    let wake = self.state.schedule_on_ingest(self.clock.now());
                    self.apply(wake);
                }
                Ready(Some(Err(err))) => {
                    self.finish();
                    return Ready(Some(Err(err)));
                }
                Ready(None) => {
                    self.finish();
                }
                Pending => {
                    // The input stream is not ready.
                    return Pending;
                }
            }
        }
    }

    fn apply(&mut self, wake: Wake) {
        match wake {
            Wake::Unchanged => {}
            Wake::Request(at) => {
                let delay = self.clock.duration_until(at);
                self.timer = Some(Box::pin(sleep(delay)));
            }
            Wake::Cancel => {
                self.timer = None;
            }
        }
    }

    /// Stops reading input and queues everything still buffered.
    fn finish(&mut self) {
        self.input = None;
        self.timer = None;

        let released = self.state.drain_all();
        if !released.is_empty() {
            debug!(count = released.len(), "drain buffered events at end of input");
        }
        self.pending.extend(released);
    }
}
