//! TLS over a non-blocking TCP socket.
//!
//! rustls is sans-IO: the session only ever sees bytes we hand it. That makes
//! the handshake a step function (`try_handshake`) that the timeout policy can
//! interleave with bounded readiness waits.

use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore};
use tokio::net::TcpStream;

use crate::net::connector::{connect_tcp, Connector};
use crate::net::socket::{Handshake, Socket};

/// Adapts a tokio stream's `try_*` methods to `std::io`, as rustls expects.
struct TryIo<'a>(&'a TcpStream);

impl Read for TryIo<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.try_read(buf)
    }
}

impl Write for TryIo<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.try_write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn tls_error(err: rustls::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Client TLS session bound to a TCP stream.
pub struct TlsSocket {
    tcp: TcpStream,
    session: ClientConnection,
}

impl std::fmt::Debug for TlsSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsSocket")
            .field("peer", &self.tcp.peer_addr().ok())
            .field("handshaking", &self.session.is_handshaking())
            .finish()
    }
}

impl TlsSocket {
    /// Wrap a connected stream. No bytes are exchanged until the handshake
    /// is driven.
    pub fn new(tcp: TcpStream, config: Arc<ClientConfig>, host: &str) -> io::Result<Self> {
        let name = ServerName::try_from(host)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?
            .to_owned();
        let session = ClientConnection::new(config, name).map_err(tls_error)?;
        Ok(Self { tcp, session })
    }

    pub fn is_handshaking(&self) -> bool {
        self.session.is_handshaking()
    }

    /// ALPN protocol agreed with the server, once the handshake is complete.
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.session.alpn_protocol()
    }

    /// Write queued TLS records until the session has none left.
    fn flush_records(&mut self) -> io::Result<()> {
        while self.session.wants_write() {
            self.session.write_tls(&mut TryIo(&self.tcp))?;
        }
        Ok(())
    }

    /// Feed one read of ciphertext into the session. Returns false at EOF.
    fn fill(&mut self) -> io::Result<bool> {
        if self.session.read_tls(&mut TryIo(&self.tcp))? == 0 {
            return Ok(false);
        }
        self.session.process_new_packets().map_err(tls_error)?;
        Ok(true)
    }
}

impl Socket for TlsSocket {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.session.reader().read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                // Peer closed without close_notify.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(0),
                Err(e) => return Err(e),
            }
            if !self.fill()? {
                return Ok(0);
            }
        }
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Earlier records go first so a WouldBlock here never loses plaintext.
        self.flush_records()?;
        let n = self.session.writer().write(buf)?;
        match self.flush_records() {
            Ok(()) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(n),
            Err(e) => Err(e),
        }
    }

    fn try_flush(&mut self) -> io::Result<()> {
        self.flush_records()
    }

    fn try_handshake(&mut self) -> io::Result<Handshake> {
        loop {
            if self.session.wants_write() {
                match self.session.write_tls(&mut TryIo(&self.tcp)) {
                    Ok(_) => continue,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        return Ok(Handshake::WantWrite)
                    }
                    Err(e) => return Err(e),
                }
            }
            if !self.session.is_handshaking() {
                return Ok(Handshake::Complete);
            }
            match self.fill() {
                Ok(true) => {}
                Ok(false) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed during TLS handshake",
                    ))
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Handshake::WantRead),
                Err(e) => return Err(e),
            }
        }
    }

    async fn readable(&self) -> io::Result<()> {
        self.tcp.readable().await
    }

    async fn writable(&self) -> io::Result<()> {
        self.tcp.writable().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.try_read(buf) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.tcp.readable().await?,
                result => return result,
            }
        }
    }

    async fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.try_write(buf) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.tcp.writable().await?,
                Err(e) => return Err(e),
            }
        }
        loop {
            match self.flush_records() {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.tcp.writable().await?,
                result => return result,
            }
        }
    }

    async fn handshake(&mut self) -> io::Result<()> {
        loop {
            match self.try_handshake()? {
                Handshake::Complete => return Ok(()),
                Handshake::WantRead => self.tcp.readable().await?,
                Handshake::WantWrite => self.tcp.writable().await?,
            }
        }
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.peer_addr()
    }
}

/// Client config trusting the Mozilla root set, offering ALPN `http/1.1`.
pub fn default_client_config() -> Result<Arc<ClientConfig>, rustls::Error> {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let mut config =
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

/// Opens TCP sockets wrapped in a (not yet negotiated) TLS session.
/// Drive the handshake with `TimeoutPolicy::connect_secure`.
#[derive(Clone)]
pub struct TlsConnector {
    config: Arc<ClientConfig>,
}

impl TlsConnector {
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    pub fn with_default_roots() -> Result<Self, rustls::Error> {
        Ok(Self::new(default_client_config()?))
    }
}

impl Connector for TlsConnector {
    type Socket = TlsSocket;

    async fn open(&self, host: &str, port: u16) -> io::Result<TlsSocket> {
        let tcp = connect_tcp(host, port, true).await?;
        TlsSocket::new(tcp, Arc::clone(&self.config), host)
    }
}
