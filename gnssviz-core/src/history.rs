//! Bounded sample histories
//!
//! Fixed capacity FIFO buffers. Appending past capacity evicts the oldest
//! entry.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

/// A single `(time, value)` sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// GPS time of week in seconds
    pub t: f64,
    pub v: f64,
}

impl Sample {
    pub fn new(t: f64, v: f64) -> Self {
        Sample { t, v }
    }
}

/// FIFO with a fixed capacity (newest at the back)
#[derive(Debug, Clone)]
pub struct History<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> History<T> {
    /// Capacity is clamped to at least one entry
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        History {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, returning the evicted entry if the buffer was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Independent sample histories keyed by channel name
#[derive(Debug, Clone)]
pub struct ChannelHistories {
    channels: BTreeMap<String, History<Sample>>,
    capacity: usize,
}

impl ChannelHistories {
    pub fn new(capacity: usize) -> Self {
        ChannelHistories {
            channels: BTreeMap::new(),
            capacity,
        }
    }

    pub fn push(&mut self, channel: &str, sample: Sample) {
        match self.channels.get_mut(channel) {
            Some(history) => {
                history.push(sample);
            }
            None => {
                let mut history = History::new(self.capacity);
                history.push(sample);
                self.channels.insert(channel.to_string(), history);
            }
        }
    }

    pub fn get(&self, channel: &str) -> Option<&History<Sample>> {
        self.channels.get(channel)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Copy of every channel, ordered by channel name
    pub fn snapshot(&self) -> BTreeMap<String, Vec<Sample>> {
        self.channels
            .iter()
            .map(|(name, history)| (name.clone(), history.to_vec()))
            .collect()
    }
}
