use std::collections::{BTreeMap, btree_map::Entry};

/// A staging buffer holding events ordered by timestamp. Events that
/// share a timestamp are kept in arrival order.
#[derive(Debug, Clone)]
pub struct Buffer<T> {
    buffer: BTreeMap<i64, Vec<T>>,
    len: usize,
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Self {
            buffer: BTreeMap::new(),
            len: 0,
        }
    }
}

impl<T> Buffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct timestamps.
    pub fn key_count(&self) -> usize {
        self.buffer.len()
    }

    /// The smallest buffered timestamp.
    pub fn first_key(&self) -> Option<i64> {
        self.buffer.keys().next().copied()
    }

    /// Appends an event behind the ones already stored under
    /// `timestamp`.
    pub fn push(&mut self, timestamp: i64, item: T) {
        self.buffer.entry(timestamp).or_default().push(item);
        self.len += 1;
    }

    /// Moves every event of `other` into this buffer, leaving `other`
    /// empty. Events of `other` go behind existing events with the same
    /// timestamp.
    pub fn merge_from(&mut self, other: &mut Buffer<T>) {
        let incoming = std::mem::take(&mut other.buffer);
        self.len += other.len;
        other.len = 0;

        for (timestamp, mut items) in incoming {
            match self.buffer.entry(timestamp) {
                Entry::Vacant(entry) => {
                    entry.insert(items);
                }
                Entry::Occupied(mut entry) => {
                    entry.get_mut().append(&mut items);
                }
            }
        }
    }

    /// Removes the longest prefix of timestamps satisfying `pred` and
    /// appends their events to `out` in order. Returns the largest
    /// removed timestamp.
    pub fn drain_while<F>(&mut self, out: &mut Vec<T>, mut pred: F) -> Option<i64>
    where
        F: FnMut(i64) -> bool,
    {
        let mut last = None;

        while let Some(entry) = self.buffer.first_entry() {
            if !pred(*entry.key()) {
                break;
            }

            let (timestamp, mut items) = entry.remove_entry();
            self.len -= items.len();
            out.append(&mut items);
            last = Some(timestamp);
        }

        last
    }

    /// Splits off the events stamped strictly before `ts` into a new
    /// buffer.
    pub fn split_before(&mut self, ts: i64) -> Buffer<T> {
        let kept = self.buffer.split_off(&ts);
        let expired = std::mem::replace(&mut self.buffer, kept);
        let len: usize = expired.values().map(Vec::len).sum();
        self.len -= len;

        Buffer {
            buffer: expired,
            len,
        }
    }

    /// Removes every event. Returns the largest removed timestamp.
    pub fn drain_all(&mut self, out: &mut Vec<T>) -> Option<i64> {
        self.drain_while(out, |_| true)
    }

    /// Iterates over timestamps and the events stored under them.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &[T])> {
        self.buffer
            .iter()
            .map(|(timestamp, items)| (*timestamp, items.as_slice()))
    }
}
