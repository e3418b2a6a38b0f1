use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::analytics::event::EventRecord;

/// What to give up when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    #[default]
    DropOldest,
    DropNewest,
}

/// Events created before consent was granted, oldest first.
#[derive(Debug)]
pub struct PendingQueue {
    records: VecDeque<EventRecord>,
    capacity: usize,
    overflow: OverflowPolicy,
    dropped: usize,
}

impl PendingQueue {
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            overflow,
            dropped: 0,
        }
    }

    /// Appends a record, returning whichever record was discarded to stay
    /// within capacity.
    pub fn push(&mut self, record: EventRecord) -> Option<EventRecord> {
        if self.records.len() < self.capacity {
            self.records.push_back(record);
            return None;
        }
        self.dropped += 1;
        match self.overflow {
            OverflowPolicy::DropOldest => {
                let oldest = self.records.pop_front();
                self.records.push_back(record);
                oldest
            }
            OverflowPolicy::DropNewest => Some(record),
        }
    }

    /// Empties the queue, yielding records in insertion order.
    pub fn drain(&mut self) -> impl Iterator<Item = EventRecord> {
        std::mem::take(&mut self.records).into_iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::context::PageContext;
    use crate::analytics::event::{EventContext, Properties};

    fn record(name: &str) -> EventRecord {
        let context = EventContext {
            timestamp: 1,
            session_id: "s".to_string(),
            user_id: "u".to_string(),
            page: PageContext::default(),
        };
        EventRecord::new(name, Properties::new(), &context)
    }

    fn names(queue: &mut PendingQueue) -> Vec<String> {
        queue.drain().map(|r| r.name().to_string()).collect()
    }

    #[test]
    fn drains_in_insertion_order() {
        let mut queue = PendingQueue::new(10, OverflowPolicy::DropOldest);
        for name in ["a", "b", "c"] {
            assert!(queue.push(record(name)).is_none());
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(names(&mut queue), ["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drop_oldest_keeps_latest_records() {
        let mut queue = PendingQueue::new(2, OverflowPolicy::DropOldest);
        queue.push(record("a"));
        queue.push(record("b"));
        let dropped = queue.push(record("c")).unwrap();

        assert_eq!(dropped.name(), "a");
        assert_eq!(queue.dropped(), 1);
        assert_eq!(names(&mut queue), ["b", "c"]);
    }

    #[test]
    fn drop_newest_rejects_incoming_record() {
        let mut queue = PendingQueue::new(2, OverflowPolicy::DropNewest);
        queue.push(record("a"));
        queue.push(record("b"));
        let dropped = queue.push(record("c")).unwrap();

        assert_eq!(dropped.name(), "c");
        assert_eq!(names(&mut queue), ["a", "b"]);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let queue = PendingQueue::new(0, OverflowPolicy::DropOldest);
        assert_eq!(queue.capacity(), 1);
    }
}
