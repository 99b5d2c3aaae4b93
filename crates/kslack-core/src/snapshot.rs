use crate::schedule::GateState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The snapshot layout produced by this version of the crate.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A checkpoint of a [State](crate::State).
///
/// Buffered events are recorded as ids of type `I`. Storing the payloads
/// and turning ids back into events is up to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<I> {
    pub version: u32,
    pub primary: BTreeMap<i64, Vec<I>>,
    pub secondary: BTreeMap<i64, Vec<I>>,
    pub k: i64,
    pub coverage_window: i64,
    pub alpha: f64,
    pub previous_alpha: f64,
    pub previous_error: f64,
    pub largest_timestamp: Option<i64>,
    pub last_emitted: Option<i64>,
    pub schedule: GateState,
    pub correlations: Vec<f64>,
    pub timestamps: Vec<i64>,
    pub batch_counter: u64,
}

impl<I> Snapshot<I> {
    /// Number of buffered event ids.
    pub fn len(&self) -> usize {
        self.primary
            .values()
            .chain(self.secondary.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
