//! Errors raised while talking to the remote collector.

use std::io;

use thiserror::Error;

/// Connection and delivery failures.
///
/// Every variant is transient from the delivery loop's point of view: the
/// record is re-queued and the connection re-established after a pause.
#[derive(Debug, Error)]
pub enum ShipError {
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to {endpoint}: {source}")]
    Dial { endpoint: String, source: io::Error },
    #[error("TLS handshake with {endpoint} failed: {source}")]
    Tls { endpoint: String, source: io::Error },
    #[error("not connected to {endpoint}")]
    NotConnected { endpoint: String },
    #[error("failed to write to {endpoint}: {source}")]
    Write { endpoint: String, source: io::Error },
}

impl ShipError {
    /// Endpoint the failed operation targeted.
    pub fn endpoint(&self) -> &str {
        match self {
            ShipError::Resolve { endpoint, .. }
            | ShipError::Dial { endpoint, .. }
            | ShipError::Tls { endpoint, .. }
            | ShipError::NotConnected { endpoint }
            | ShipError::Write { endpoint, .. } => endpoint,
        }
    }
}
