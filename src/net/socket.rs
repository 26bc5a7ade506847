//! Socket abstraction consumed by the timeout policies.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Progress reported by one non-blocking handshake step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    /// The handshake has finished; application data may flow.
    Complete,
    /// Call again once the socket is readable.
    WantRead,
    /// Call again once the socket is writable.
    WantWrite,
}

/// A connected byte stream.
///
/// The `try_*` methods never wait: they return `ErrorKind::WouldBlock` when
/// the socket is not ready, and `Ok(0)` from `try_read` means end-of-stream.
/// `readable`/`writable` resolve once the reactor reports readiness; they may
/// fire spuriously, so callers retry the `try_*` call in a loop.
///
/// `read`, `write_all` and `handshake` are the blocking counterparts.
pub trait Socket: Send + Sync {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Push out anything buffered below the caller (e.g. TLS records).
    fn try_flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Advance the secure-channel handshake without waiting.
    /// Plain sockets have nothing to negotiate.
    fn try_handshake(&mut self) -> io::Result<Handshake> {
        Ok(Handshake::Complete)
    }

    fn readable(&self) -> impl Future<Output = io::Result<()>> + Send;

    fn writable(&self) -> impl Future<Output = io::Result<()>> + Send;

    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;

    fn write_all(&mut self, buf: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    fn handshake(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

/// Plain TCP socket.
#[derive(Debug)]
pub struct TcpSocket {
    inner: TcpStream,
}

impl TcpSocket {
    pub fn new(inner: TcpStream) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &TcpStream {
        &self.inner
    }

    pub fn into_inner(self) -> TcpStream {
        self.inner
    }
}

impl Socket for TcpSocket {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.try_read(buf)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.try_write(buf)
    }

    async fn readable(&self) -> io::Result<()> {
        self.inner.readable().await
    }

    async fn writable(&self) -> io::Result<()> {
        self.inner.writable().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).await
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf).await
    }

    async fn handshake(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }
}
