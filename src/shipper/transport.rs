//! Transport primitives for the shipping client.
//!
//! [`Connector`] is the seam between the connection manager and the network:
//! the production [`TcpConnector`] dials the collector over plain TCP or TLS,
//! while tests plug in scripted connectors.

use std::{
    io::{self, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::{TlsConnector, TlsStream};
use socket2::SockRef;

use super::error::ShipError;

/// Collector address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpTarget {
    /// Hostname or IP address to connect to.
    pub host: String,
    /// TCP port number.
    pub port: u16,
    /// Optional TLS configuration.
    pub tls: Option<TlsOptions>,
}

impl TcpTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: None,
        }
    }

    /// `host:port` form used in diagnostics.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(|iter| iter.collect())
    }
}

/// TLS connection options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsOptions {
    /// Domain name presented during the TLS handshake.
    pub domain: String,
    /// Skip certificate validation when true (intended for tests).
    pub insecure_skip_verify: bool,
}

impl TlsOptions {
    fn connector(&self) -> io::Result<TlsConnector> {
        let mut builder = TlsConnector::builder();
        if self.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        builder.build().map_err(io::Error::other)
    }
}

/// Writable half of an established connection.
pub type Link = Box<dyn Write + Send>;

/// Opens connections to the collector. One call is one attempt.
pub trait Connector: Send {
    /// `host:port` of the remote end, used in errors and diagnostics.
    fn endpoint(&self) -> String;

    /// Establish a new connection.
    fn connect(&mut self) -> Result<Link, ShipError>;
}

/// Active socket connection.
pub enum ActiveConnection {
    PlainTcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl ActiveConnection {
    fn tcp(&self) -> &TcpStream {
        match self {
            ActiveConnection::PlainTcp(stream) => stream,
            ActiveConnection::Tls(stream) => stream.get_ref(),
        }
    }

    /// Update the write timeout for the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.tcp().set_write_timeout(timeout)
    }
}

impl Write for ActiveConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ActiveConnection::PlainTcp(stream) => stream.write(buf),
            ActiveConnection::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ActiveConnection::PlainTcp(stream) => stream.flush(),
            ActiveConnection::Tls(stream) => stream.flush(),
        }
    }
}

fn dial(addrs: &[SocketAddr], timeout: Option<Duration>) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in addrs {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses to dial")
    }))
}

/// Low latency and keep-alive; failures to set either are not fatal.
fn tune(stream: &TcpStream) {
    let _ = stream.set_nodelay(true);
    let _ = SockRef::from(stream).set_keepalive(true);
}

/// Resolve, dial, tune and optionally wrap `target` in TLS.
pub fn connect_target(
    target: &TcpTarget,
    connect_timeout: Option<Duration>,
) -> Result<ActiveConnection, ShipError> {
    let endpoint = target.endpoint();
    let addrs = target.socket_addrs().map_err(|source| ShipError::Resolve {
        endpoint: endpoint.clone(),
        source,
    })?;
    let stream = dial(&addrs, connect_timeout).map_err(|source| ShipError::Dial {
        endpoint: endpoint.clone(),
        source,
    })?;
    tune(&stream);

    let Some(tls) = &target.tls else {
        return Ok(ActiveConnection::PlainTcp(stream));
    };
    let handshake = || -> io::Result<TlsStream<TcpStream>> {
        let connector = tls.connector()?;
        stream.set_read_timeout(connect_timeout)?;
        stream.set_write_timeout(connect_timeout)?;
        let stream = connector
            .connect(&tls.domain, stream)
            .map_err(io::Error::other)?;
        stream.get_ref().set_read_timeout(None)?;
        stream.get_ref().set_write_timeout(None)?;
        Ok(stream)
    };
    handshake()
        .map(|stream| ActiveConnection::Tls(Box::new(stream)))
        .map_err(|source| ShipError::Tls { endpoint, source })
}

/// Production connector dialling a [`TcpTarget`].
#[derive(Clone, Debug)]
pub struct TcpConnector {
    target: TcpTarget,
    connect_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(target: TcpTarget) -> Self {
        Self {
            target,
            connect_timeout: None,
            write_timeout: None,
        }
    }

    pub fn with_timeouts(
        mut self,
        connect_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Self {
        self.connect_timeout = connect_timeout;
        self.write_timeout = write_timeout;
        self
    }
}

impl Connector for TcpConnector {
    fn endpoint(&self) -> String {
        self.target.endpoint()
    }

    fn connect(&mut self) -> Result<Link, ShipError> {
        let conn = connect_target(&self.target, self.connect_timeout)?;
        if self.write_timeout.is_some() {
            let _ = conn.set_write_timeout(self.write_timeout);
        }
        Ok(Box::new(conn))
    }
}
