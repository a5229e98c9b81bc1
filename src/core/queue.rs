use crate::core::event::Event;
use ordered_float::NotNan;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::rc::Rc;
use tracing::trace;

/// A heap entry: the event plus its insertion sequence number.
///
/// Ordering is `(time, seq)`, so equal-time events pop in insertion order.
/// That makes a run a pure function of its seed.
#[derive(Debug)]
struct Scheduled {
    at: NotNan<f64>,
    seq: u64,
    event: Rc<Event>,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.at.cmp(&other.at) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of pending events with lazy invalidation.
///
/// The heap never searches for entries to delete; stale records accumulate
/// until their turn and are discarded in O(1) on pop.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an event at its recorded time.
    pub fn push(&mut self, event: Rc<Event>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled {
            at: event.time_key(),
            seq,
            event,
        }));
    }

    /// Pop the earliest still-pending event, discarding stale entries.
    ///
    /// The returned record is marked consumed, so references left in owner
    /// sets are inert from here on.
    pub fn pop_valid(&mut self) -> Option<Rc<Event>> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            if entry.event.is_valid() {
                entry.event.invalidate();
                return Some(entry.event);
            }
            trace!(
                time = entry.event.time(),
                kind = ?entry.event.kind(),
                "discarding stale event"
            );
        }
        None
    }

    /// Number of queued entries, stale ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::EventKind;

    fn event(time: f64, kind: EventKind) -> Rc<Event> {
        Rc::new(Event::new(time, kind).unwrap())
    }

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.push(event(2.0, EventKind::End));
        q.push(event(0.5, EventKind::Export));
        q.push(event(1.0, EventKind::BallWall { i: 0, wall: 1 }));
        let times: Vec<f64> = std::iter::from_fn(|| q.pop_valid().map(|e| e.time())).collect();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn equal_times_pop_in_insertion_order() {
        let mut q = EventQueue::new();
        q.push(event(1.0, EventKind::BallBall { i: 0, j: 1 }));
        q.push(event(1.0, EventKind::Export));
        q.push(event(1.0, EventKind::End));
        let kinds: Vec<EventKind> =
            std::iter::from_fn(|| q.pop_valid().map(|e| e.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::BallBall { i: 0, j: 1 },
                EventKind::Export,
                EventKind::End
            ]
        );
    }

    #[test]
    fn invalidated_events_are_skipped() {
        let mut q = EventQueue::new();
        let stale = event(0.5, EventKind::BallBall { i: 0, j: 1 });
        q.push(stale.clone());
        q.push(event(1.0, EventKind::End));
        stale.invalidate();
        let next = q.pop_valid().unwrap();
        assert_eq!(next.kind(), EventKind::End);
        assert!(q.pop_valid().is_none());
    }

    #[test]
    fn popped_events_are_marked_consumed() {
        let mut q = EventQueue::new();
        let ev = event(0.5, EventKind::Export);
        q.push(ev.clone());
        assert!(q.pop_valid().is_some());
        assert!(!ev.is_valid());
    }
}
