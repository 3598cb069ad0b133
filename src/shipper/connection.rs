//! Ownership of the single outbound connection.

use std::{io::Write, time::Duration};

use super::{
    backoff::RetryDelay,
    config::BackoffPolicy,
    error::ShipError,
    transport::{Connector, Link},
};

/// Whether a live connection is currently held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Establishes, tears down and re-establishes the collector connection.
///
/// [`connect`](Self::connect) is a single attempt; retrying is left to the
/// delivery loop, which paces itself with [`retry_delay`](Self::retry_delay).
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    link: Option<Link>,
    retry: RetryDelay,
}

impl ConnectionManager {
    pub fn new(connector: Box<dyn Connector>, backoff: BackoffPolicy) -> Self {
        Self {
            connector,
            link: None,
            retry: RetryDelay::new(backoff),
        }
    }

    pub fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    /// Drop any existing connection and open a fresh one.
    ///
    /// Failure doubles the retry delay up to its ceiling and leaves the
    /// manager disconnected. Success resets the delay to its base value.
    pub fn connect(&mut self) -> Result<(), ShipError> {
        self.disconnect();
        match self.connector.connect() {
            Ok(link) => {
                self.link = Some(link);
                self.retry.reset();
                Ok(())
            }
            Err(err) => {
                self.retry.record_failure();
                Err(err)
            }
        }
    }

    /// Close the current connection, if any. Close errors are ignored.
    pub fn disconnect(&mut self) {
        if let Some(mut link) = self.link.take() {
            let _ = link.flush();
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.link.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Current pause before the next reconnection attempt.
    pub fn retry_delay(&self) -> Duration {
        self.retry.current()
    }

    /// Write `bytes` in full and flush.
    ///
    /// The connection is kept after a failed write; the next
    /// [`connect`](Self::connect) replaces it.
    pub fn write_record(&mut self, bytes: &[u8]) -> Result<(), ShipError> {
        let Some(link) = self.link.as_mut() else {
            return Err(ShipError::NotConnected {
                endpoint: self.connector.endpoint(),
            });
        };
        link.write_all(bytes)
            .and_then(|()| link.flush())
            .map_err(|source| ShipError::Write {
                endpoint: self.connector.endpoint(),
                source,
            })
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.endpoint())
            .field("state", &self.state())
            .field("retry_delay", &self.retry_delay())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipper::config::{MAX_RETRY_DELAY, RETRY_DELAY};
    use crate::shipper::test_support::{ScriptedConnector, WriteBehaviour};
    use crate::shipper::transport::{TcpConnector, TcpTarget};
    use std::net::TcpListener;

    fn refused_manager() -> ConnectionManager {
        let port = TcpListener::bind(("127.0.0.1", 0))
            .and_then(|l| l.local_addr())
            .expect("ephemeral port")
            .port();
        let connector = TcpConnector::new(TcpTarget::new("127.0.0.1", port));
        ConnectionManager::new(Box::new(connector), BackoffPolicy::default())
    }

    #[test]
    fn failed_connect_doubles_delay() {
        let mut manager = refused_manager();
        assert!(manager.connect().is_err());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.retry_delay(), RETRY_DELAY * 2);
        assert!(manager.connect().is_err());
        assert_eq!(manager.retry_delay(), RETRY_DELAY * 4);
    }

    #[test]
    fn unresolvable_host_fails_and_backs_off() {
        let connector = TcpConnector::new(TcpTarget::new("", 10000));
        let mut manager = ConnectionManager::new(Box::new(connector), BackoffPolicy::default());
        assert!(manager.connect().is_err());
        assert_eq!(manager.retry_delay(), RETRY_DELAY * 2);
    }

    #[test]
    fn delay_is_capped_after_repeated_failures() {
        let connector = ScriptedConnector::failing();
        let mut manager = ConnectionManager::new(Box::new(connector), BackoffPolicy::default());
        for _ in 0..20 {
            assert!(manager.connect().is_err());
        }
        assert_eq!(manager.retry_delay(), MAX_RETRY_DELAY);
    }

    #[test]
    fn successful_connect_resets_delay() {
        let connector = ScriptedConnector::new(vec![
            Err(()),
            Err(()),
            Ok(WriteBehaviour::Accept),
        ]);
        let mut manager = ConnectionManager::new(Box::new(connector), BackoffPolicy::default());
        assert!(manager.connect().is_err());
        assert!(manager.connect().is_err());
        assert_eq!(manager.retry_delay(), RETRY_DELAY * 4);
        manager.connect().expect("third attempt succeeds");
        assert!(manager.is_connected());
        assert_eq!(manager.retry_delay(), RETRY_DELAY);
    }

    #[test]
    fn connect_cycles_an_existing_connection() {
        let connector = ScriptedConnector::always_accepting();
        let attempts = connector.attempts();
        let mut manager = ConnectionManager::new(Box::new(connector), BackoffPolicy::default());
        manager.connect().expect("first connect");
        manager.connect().expect("second connect");
        assert!(manager.is_connected());
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn write_without_connection_is_rejected() {
        let mut manager = ConnectionManager::new(
            Box::new(ScriptedConnector::failing()),
            BackoffPolicy::default(),
        );
        let err = manager.write_record(b"x").expect_err("not connected");
        assert!(matches!(err, ShipError::NotConnected { .. }));
    }

    #[test]
    fn write_failure_is_reported() {
        let connector = ScriptedConnector::new(vec![Ok(WriteBehaviour::Fail)]);
        let mut manager = ConnectionManager::new(Box::new(connector), BackoffPolicy::default());
        manager.connect().expect("connect");
        let err = manager.write_record(b"x").expect_err("write fails");
        assert!(matches!(err, ShipError::Write { .. }));
    }
}
