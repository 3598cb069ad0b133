//! The shipping client tying queue, connection and delivery loop together.

use std::{
    any::Any,
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::RecvTimeoutError;
use log::{error, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::backend::{Backend, BackendError};

use super::{
    config::ShipperConfig,
    connection::{ConnectionManager, ConnectionState},
    error::ShipError,
    queue::{MessageQueue, QueueClosed, ShipRecord},
    transport::{Connector, TcpConnector},
    warner::RejectionWarner,
    worker::{WorkerParts, spawn_worker},
};

/// Upper bound on how long dropping a client waits for pending records.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
/// How long [`Backend::flush`] waits for the queue to drain.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);
/// Minimum wait for the delivery thread to exit once told to stop.
const STOP_GRACE: Duration = Duration::from_millis(250);

/// The initial connection attempt failed.
///
/// The client is still fully usable: once started, its delivery loop keeps
/// retrying with backoff. Recover it with [`into_client`](Self::into_client).
#[derive(Debug, Error)]
#[error("initial connection failed: {source}")]
pub struct EagerConnectError {
    client: Box<ShippingClient>,
    source: ShipError,
}

impl EagerConnectError {
    /// The connection failure.
    pub fn error(&self) -> &ShipError {
        &self.source
    }

    /// Take the usable client out of the error.
    pub fn into_client(self) -> ShippingClient {
        *self.client
    }
}

/// Buffered, reconnecting log shipper for a single collector.
///
/// Producers call [`enqueue_line`](Self::enqueue_line) and return as soon as
/// the record is queued. A background delivery loop, spawned by
/// [`start`](Self::start), writes records in order and re-queues any record
/// whose write failed ahead of everything still waiting.
pub struct ShippingClient {
    token: String,
    endpoint: String,
    queue: Arc<MessageQueue>,
    connection: Arc<Mutex<ConnectionManager>>,
    worker: Mutex<Option<WorkerParts>>,
    rejections: RejectionWarner,
}

impl ShippingClient {
    /// Build a client dialling the configured TCP endpoint and try to
    /// connect immediately.
    pub fn new(config: ShipperConfig) -> Result<Self, EagerConnectError> {
        let connector = TcpConnector::new(config.target.clone())
            .with_timeouts(config.connect_timeout, config.write_timeout);
        Self::with_connector(config, connector)
    }

    /// Build a client over a custom [`Connector`] and try to connect
    /// immediately. The target in `config` is only used for diagnostics.
    pub fn with_connector<C>(config: ShipperConfig, connector: C) -> Result<Self, EagerConnectError>
    where
        C: Connector + 'static,
    {
        let endpoint = connector.endpoint();
        let mut manager = ConnectionManager::new(Box::new(connector), config.backoff);
        let initial = manager.connect();
        let client = Self {
            token: config.token,
            endpoint,
            queue: Arc::new(MessageQueue::with_capacity(config.capacity)),
            connection: Arc::new(Mutex::new(manager)),
            worker: Mutex::new(None),
            rejections: RejectionWarner::default(),
        };
        match initial {
            Ok(()) => Ok(client),
            Err(source) => Err(EagerConnectError {
                client: Box::new(client),
                source,
            }),
        }
    }

    /// Spawn the delivery loop. Returns `false` if it is already running or
    /// the client has been shut down.
    pub fn start(&self) -> bool {
        let mut worker = self.worker.lock();
        if worker.is_some() || self.queue.is_closed() {
            return false;
        }
        *worker = Some(spawn_worker(
            Arc::clone(&self.queue),
            Arc::clone(&self.connection),
        ));
        true
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Number of records waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.lock().state()
    }

    /// Pause the delivery loop will take before its next reconnect attempt.
    pub fn retry_delay(&self) -> Duration {
        self.connection.lock().retry_delay()
    }

    fn frame(&self, line: &str) -> ShipRecord {
        let mut bytes = Vec::with_capacity(self.token.len() + line.len() + 2);
        bytes.extend_from_slice(self.token.as_bytes());
        bytes.push(b' ');
        bytes.extend_from_slice(line.as_bytes());
        if !line.ends_with('\n') {
            bytes.push(b'\n');
        }
        ShipRecord::from(bytes)
    }

    /// Queue one line for delivery, blocking while the queue is full.
    ///
    /// The line is prefixed with the token and terminated with a single
    /// newline.
    pub fn enqueue_line(&self, line: &str) -> Result<(), QueueClosed> {
        self.queue.enqueue(self.frame(line)).inspect_err(|_| {
            self.rejections.record(|count| {
                warn!("logship: rejected {count} records after shutdown");
            });
        })
    }

    /// Write one line on the calling thread, bypassing the queue.
    ///
    /// Connects first when no connection is held. Intended for the last
    /// record before the process terminates.
    pub fn send_now(&self, line: &str) -> Result<(), ShipError> {
        let record = self.frame(line);
        let mut conn = self.connection.lock();
        let result = if conn.is_connected() {
            conn.write_record(record.as_bytes())
        } else {
            conn.connect()
                .and_then(|()| conn.write_record(record.as_bytes()))
        };
        if let Err(err) = &result {
            error!(
                "logship: failed to send final record: {err}: {}",
                line.trim_end_matches('\n')
            );
        }
        result
    }

    /// Wait until every queued record has been written or `timeout`
    /// elapses. Returns `true` when the queue is fully drained.
    pub fn flush(&self, timeout: Duration) -> bool {
        if !self.is_running() {
            return self.queue.wait_drained(Duration::ZERO);
        }
        self.queue.wait_drained(timeout)
    }

    /// Stop accepting records, give the delivery loop up to `timeout` to
    /// drain the queue, then stop it.
    ///
    /// Returns `true` when every record was delivered. Calling it again is a
    /// no-op that reports whether records are still waiting.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        self.queue.close();
        self.rejections.flush(|count| {
            warn!("logship: rejected {count} records after shutdown");
        });
        let Some(parts) = self.worker.lock().take() else {
            return self.queue.wait_drained(Duration::ZERO);
        };

        let drained = self.queue.wait_drained(timeout);
        drop(parts.shutdown_tx);
        let stopped = match deadline {
            Some(deadline) => {
                let remaining = deadline
                    .saturating_duration_since(Instant::now())
                    .max(STOP_GRACE);
                !matches!(
                    parts.done_rx.recv_timeout(remaining),
                    Err(RecvTimeoutError::Timeout)
                )
            }
            // A disconnect means the thread is gone; the join reports a panic.
            None => {
                let _ = parts.done_rx.recv();
                true
            }
        };
        if !stopped {
            warn!(
                "logship: delivery thread for {} did not stop within {timeout:?}",
                self.endpoint
            );
            return drained;
        }
        if parts.handle.join().is_err() {
            warn!("logship: delivery thread panicked");
        }
        self.connection.lock().disconnect();
        drained
    }
}

impl Drop for ShippingClient {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

impl Backend for ShippingClient {
    fn handle(&self, line: &str) -> Result<(), BackendError> {
        self.enqueue_line(line).map_err(|_| BackendError::Closed)
    }

    fn handle_final(&self, line: &str) -> Result<(), BackendError> {
        self.send_now(line)?;
        Ok(())
    }

    fn flush(&self) -> bool {
        ShippingClient::flush(self, DEFAULT_FLUSH_TIMEOUT)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for ShippingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippingClient")
            .field("endpoint", &self.endpoint)
            .field("pending", &self.pending())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
