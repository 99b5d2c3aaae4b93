//! kslack-node - reorders line-delimited timestamped events.
//!
//! The node reads events from stdin, one per line, in the form
//! `timestamp,correlation[,payload]` where `timestamp` is milliseconds
//! since the Unix epoch. It writes them to stdout in timestamp order
//! using the [kslack-core](../kslack_core/index.html) reorder buffer.
//! Lines that fail to parse are logged and skipped.
//!
//! # Configuration
//!
//! The node requires a YAML configuration file:
//!
//! ```yaml
//! reorder:
//!   batch_size: 1000
//!   timeout: 2s          # or milliseconds, -1 disables
//!   max_k: -1            # milliseconds, -1 means unbounded
//!   discard_late_arrivals: false
//!   wake_interval: 1s
//! accuracy:
//!   error_threshold: 0.03
//!   confidence_level: 0.95
//! io:
//!   delimiter: ","
//! ```

pub mod config;
pub mod node;

pub use config::Config;
pub use node::{KSlackNode, Record};
