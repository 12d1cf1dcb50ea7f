use std::collections::VecDeque;

use super::event::EventEntry;
use crate::kernel::time::display_time;

pub const DEFAULT_CAPACITY: usize = 80;

/// Bounded session history, newest first.
/// `append` is the only mutator; the oldest entries fall off the tail.
#[derive(Debug, Clone)]
pub struct TelemetryRecorder {
    buffer: VecDeque<EventEntry>,
    capacity: usize,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity is at least one entry.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Stamp and record `text`. `ts` is source epoch seconds, if any.
    pub fn append(&mut self, text: impl Into<String>, ts: Option<f64>) -> &EventEntry {
        self.record(EventEntry::new(display_time(ts), text))
    }

    pub fn record(&mut self, entry: EventEntry) -> &EventEntry {
        self.buffer.push_front(entry);
        self.buffer.truncate(self.capacity);
        &self.buffer[0]
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&EventEntry> {
        self.buffer.front()
    }

    /// Newest-first iteration.
    pub fn iter(&self) -> impl Iterator<Item = &EventEntry> {
        self.buffer.iter()
    }

    pub fn entries(&self) -> Vec<EventEntry> {
        self.buffer.iter().cloned().collect()
    }
}
