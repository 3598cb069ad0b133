//! Buffered TCP log shipping.
//!
//! [`ShippingClient`] accepts formatted lines from any number of producer
//! threads and delivers them to a remote collector from a single background
//! thread. Records are framed as `<token> <line>\n`. The client keeps one
//! persistent connection, reconnects with exponential backoff after failures
//! and re-queues a record whose write failed ahead of every record still
//! waiting, so delivery order matches enqueue order apart from at-least-once
//! redelivery.

mod backoff;
mod client;
mod config;
mod connection;
mod error;
mod queue;
mod transport;
mod warner;
mod worker;

#[cfg(test)]
mod test_support;

pub use backoff::RetryDelay;
pub use client::{DEFAULT_FLUSH_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT, EagerConnectError, ShippingClient};
pub use config::{
    BackoffPolicy, ConfigError, DEFAULT_QUEUE_CAPACITY, ENDPOINT_ENV, LOG_ENTRIES_PORT,
    LOG_ENTRIES_URL, MAX_RETRY_DELAY, PORT_ENV, RETRY_DELAY, ShipperConfig, TOKEN_ENV,
};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::ShipError;
pub use queue::{MessageQueue, QueueClosed, ShipRecord};
pub use transport::{
    ActiveConnection, Connector, Link, TcpConnector, TcpTarget, TlsOptions, connect_target,
};
pub use warner::REJECTION_WARN_INTERVAL;
