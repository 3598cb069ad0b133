//! Bounded FIFO of records waiting for delivery.
//!
//! Producers call [`MessageQueue::enqueue`] and block while the queue is at
//! capacity. A single consumer (the delivery loop) pops records and hands
//! failed ones back with [`MessageQueue::push_front`], which makes the record
//! the next one out while everything already waiting keeps its relative
//! order behind it.

use std::{
    collections::VecDeque,
    fmt,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// One fully formatted record ready for the wire, token prefix included.
#[derive(Clone, PartialEq, Eq)]
pub struct ShipRecord(Vec<u8>);

impl ShipRecord {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ShipRecord {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for ShipRecord {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for ShipRecord {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl fmt::Debug for ShipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShipRecord({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// Returned by [`MessageQueue::enqueue`] once the queue is closed. Carries
/// the rejected record back to the caller.
#[derive(Debug, Error)]
#[error("message queue is closed")]
pub struct QueueClosed(pub ShipRecord);

#[derive(Default)]
struct QueueState {
    items: VecDeque<ShipRecord>,
    /// A record has been popped and is neither delivered nor handed back.
    in_flight: bool,
    closed: bool,
}

impl QueueState {
    fn is_drained(&self) -> bool {
        self.items.is_empty() && !self.in_flight
    }
}

/// Concurrency-safe bounded queue with front reinsertion.
pub struct MessageQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    readable: Condvar,
    writable: Condvar,
    drained: Condvar,
}

impl MessageQueue {
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.get()),
                ..QueueState::default()
            }),
            capacity: capacity.get(),
            readable: Condvar::new(),
            writable: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `record`, blocking while the queue is full.
    ///
    /// Records are never dropped: the only way out without enqueueing is the
    /// queue being closed.
    pub fn enqueue(&self, record: ShipRecord) -> Result<(), QueueClosed> {
        let mut state = self.state.lock();
        while state.items.len() >= self.capacity && !state.closed {
            self.writable.wait(&mut state);
        }
        if state.closed {
            return Err(QueueClosed(record));
        }
        state.items.push_back(record);
        self.readable.notify_one();
        Ok(())
    }

    /// Make `record` the next one out.
    ///
    /// Never blocks. Because the consumer is handing back a record it
    /// removed itself, the queue may briefly hold one record more than its
    /// capacity when producers filled the freed slot in the meantime.
    /// Accepted even after [`close`](Self::close) so a draining consumer
    /// cannot lose the record it was holding.
    pub fn push_front(&self, record: ShipRecord) {
        let mut state = self.state.lock();
        state.items.push_front(record);
        state.in_flight = false;
        self.readable.notify_one();
    }

    /// Remove the oldest record, blocking until one is available.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub fn pop(&self) -> Option<ShipRecord> {
        let mut state = self.state.lock();
        loop {
            if let Some(record) = state.items.pop_front() {
                state.in_flight = true;
                self.writable.notify_one();
                return Some(record);
            }
            if state.closed {
                return None;
            }
            self.readable.wait(&mut state);
        }
    }

    /// Remove the oldest record without blocking.
    pub fn try_pop(&self) -> Option<ShipRecord> {
        let mut state = self.state.lock();
        let record = state.items.pop_front()?;
        state.in_flight = true;
        self.writable.notify_one();
        Some(record)
    }

    /// Signal that the last popped record reached the collector.
    pub fn mark_delivered(&self) {
        let mut state = self.state.lock();
        state.in_flight = false;
        if state.is_drained() {
            self.drained.notify_all();
        }
    }

    /// Wait until every record has been delivered or `timeout` elapses.
    ///
    /// Returns `true` when the queue is empty and nothing is in flight. A
    /// timeout too large to express as a deadline waits without limit.
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        while !state.is_drained() {
            match deadline {
                Some(deadline) => {
                    if self.drained.wait_until(&mut state, deadline).timed_out() {
                        return state.is_drained();
                    }
                }
                None => self.drained.wait(&mut state),
            }
        }
        true
    }

    /// Stop accepting new records and wake every waiter.
    ///
    /// Records already queued remain available to [`pop`](Self::pop).
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.readable.notify_all();
        self.writable.notify_all();
        self.drained.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Remove and return every waiting record in order.
    pub fn drain(&self) -> Vec<ShipRecord> {
        let mut state = self.state.lock();
        let drained: Vec<_> = state.items.drain(..).collect();
        self.writable.notify_all();
        if state.is_drained() {
            self.drained.notify_all();
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

impl fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
