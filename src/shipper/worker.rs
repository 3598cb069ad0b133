//! Delivery loop driving socket I/O on a dedicated thread.
//!
//! The loop pulls one record at a time from the [`MessageQueue`] and writes
//! it through the [`ConnectionManager`]. Any record that cannot be written is
//! handed back to the front of the queue *before* the loop pauses, so a
//! transient failure never loses a record. Diagnostics go to the `log` crate
//! rather than back through the facade.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::warn;
use parking_lot::Mutex;

use super::{
    connection::ConnectionManager,
    queue::{MessageQueue, ShipRecord},
};

/// Result of handling a single record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The record was written to the collector.
    Delivered,
    /// The record went back to the front of the queue.
    Requeued,
    /// A shutdown request interrupted the retry pause.
    Stopped,
}

pub(crate) struct DeliveryLoop {
    queue: Arc<MessageQueue>,
    connection: Arc<Mutex<ConnectionManager>>,
    shutdown_rx: Receiver<()>,
}

/// Handle to the delivery thread and its signalling channels.
pub(crate) struct WorkerParts {
    pub(crate) shutdown_tx: Sender<()>,
    pub(crate) done_rx: Receiver<()>,
    pub(crate) handle: JoinHandle<()>,
}

/// Spawn the delivery loop and return its communication primitives.
pub(crate) fn spawn_worker(
    queue: Arc<MessageQueue>,
    connection: Arc<Mutex<ConnectionManager>>,
) -> WorkerParts {
    let (shutdown_tx, shutdown_rx) = bounded(1);
    let (done_tx, done_rx) = bounded(1);
    let worker = DeliveryLoop::new(queue, connection, shutdown_rx);
    let handle = thread::spawn(move || {
        worker.run();
        let _ = done_tx.send(());
    });
    WorkerParts {
        shutdown_tx,
        done_rx,
        handle,
    }
}

impl DeliveryLoop {
    pub(crate) fn new(
        queue: Arc<MessageQueue>,
        connection: Arc<Mutex<ConnectionManager>>,
        shutdown_rx: Receiver<()>,
    ) -> Self {
        Self {
            queue,
            connection,
            shutdown_rx,
        }
    }

    /// Deliver records until the queue is closed and drained or a shutdown
    /// request interrupts a retry pause.
    pub(crate) fn run(self) {
        while let Some(record) = self.queue.pop() {
            if self.deliver(record) == Outcome::Stopped {
                break;
            }
        }
        let abandoned = self.queue.len();
        if abandoned > 0 {
            warn!("logship: delivery stopped with {abandoned} undelivered records");
        }
    }

    /// Handle one record popped from the queue.
    pub(crate) fn deliver(&self, record: ShipRecord) -> Outcome {
        let mut conn = self.connection.lock();
        if !conn.is_connected() {
            let delay = conn.retry_delay();
            drop(conn);
            self.queue.push_front(record);
            if !self.pause(delay) {
                return Outcome::Stopped;
            }
            if let Err(err) = self.connection.lock().connect() {
                warn!("logship: failed reconnecting to log provider: {err}");
            }
            return Outcome::Requeued;
        }

        match conn.write_record(record.as_bytes()) {
            Ok(()) => {
                drop(conn);
                self.queue.mark_delivered();
                Outcome::Delivered
            }
            Err(err) => {
                let delay = conn.retry_delay();
                drop(conn);
                self.queue.push_front(record);
                warn!("logship: failed to write to log provider: {err}");
                if !self.pause(delay) {
                    return Outcome::Stopped;
                }
                if let Err(err) = self.connection.lock().connect() {
                    warn!("logship: failed reconnecting to log provider after failing to write: {err}");
                }
                Outcome::Requeued
            }
        }
    }

    /// Sleep for `delay`, returning `false` if shutdown was requested.
    fn pause(&self, delay: Duration) -> bool {
        matches!(
            self.shutdown_rx.recv_timeout(delay),
            Err(RecvTimeoutError::Timeout)
        )
    }
}
