//! This library reorders an out-of-order stream of timestamped events
//! using an adaptive K-Slack window.
//!
//! Events are held back until the largest timestamp seen has moved at
//! least `k` past them. The window `k` grows with the disorder observed
//! in the stream, damped by a multiplier `alpha` that a
//! proportional-derivative controller tunes every `batch_size` events,
//! so that enough events arrive within the window to estimate
//! aggregates over a correlation attribute within a configured error.
//!
//! # Usage
//!
//! ```rust
//! use futures::{stream, stream::TryStreamExt};
//! use kslack_core::{Config, Reorderable, SystemClock, reorder};
//!
//! // Define your event type
//! #[derive(Debug, Clone)]
//! struct Trade {
//!     time: i64,
//!     volume: f64,
//! }
//!
//! impl Reorderable for Trade {
//!     fn timestamp(&self) -> i64 {
//!         self.time
//!     }
//!
//!     fn correlation(&self) -> f64 {
//!         self.volume
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> eyre::Result<()> {
//! let input = stream::iter([1000, 1030, 1010, 1080, 1050].map(|time| {
//!     eyre::Ok(Trade {
//!         time,
//!         volume: 10.0,
//!     })
//! }));
//!
//! // Run the reordering algorithm
//! let config = Config::with_batch_size(100).with_max_k(500);
//! let output = reorder(input, config, SystemClock)?;
//!
//! // Collect the events
//! let trades: Vec<Trade> = output.try_collect().await?;
//! assert_eq!(trades.len(), 5);
//! # Ok(())
//! # }
//! ```
//!
//! Hosts that drive the buffer from their own event loop and timer use
//! [Partition] with a [Clock] and a [Scheduler] instead.

pub mod buffer;
mod clock;
mod config;
pub mod controller;
pub mod coverage;
mod partition;
mod reorder;
pub mod schedule;
pub mod snapshot;
pub mod state;
mod types;

pub use clock::{SystemClock, TokioClock};
pub use config::{Config, MIN_BATCH_SIZE};
pub use controller::AlphaController;
pub use coverage::WindowCoverage;
pub use partition::Partition;
pub use reorder::reorder;
pub use schedule::ScheduleGate;
pub use snapshot::{SNAPSHOT_VERSION, Snapshot};
pub use state::State;
pub use types::*;
