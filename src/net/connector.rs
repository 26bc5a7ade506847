//! Socket factories.

use std::future::Future;
use std::io;

use tokio::net::TcpStream;

use crate::net::socket::{Socket, TcpSocket};

/// Opens sockets to a host. `open` is the blocking connect; the timeout
/// policy decides whether to bound it.
pub trait Connector: Send + Sync {
    type Socket: Socket;

    fn open(&self, host: &str, port: u16) -> impl Future<Output = io::Result<Self::Socket>> + Send;
}

/// Plain TCP connector.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    nodelay: bool,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self { nodelay: true }
    }

    /// Toggle `TCP_NODELAY` on opened sockets (on by default).
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve and connect, returning the raw tokio stream.
pub(crate) async fn connect_tcp(host: &str, port: u16, nodelay: bool) -> io::Result<TcpStream> {
    let stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(nodelay)?;
    Ok(stream)
}

impl Connector for TcpConnector {
    type Socket = TcpSocket;

    async fn open(&self, host: &str, port: u16) -> io::Result<TcpSocket> {
        let stream = connect_tcp(host, port, self.nodelay).await?;
        tracing::trace!(host, port, peer = ?stream.peer_addr().ok(), "TCP connected");
        Ok(TcpSocket::new(stream))
    }
}
