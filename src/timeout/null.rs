//! Unbounded policy: blocking primitives, one call per operation.

use std::io;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::net::{Connector, Socket};
use crate::timeout::{Chunk, TimeoutPolicy, Written, MAX_READ_SIZE};

/// Calls the socket's blocking primitives directly, with no deadline and no
/// retry loop. For callers that explicitly opt out of bounded operations.
#[derive(Debug)]
pub struct NullTimeout<S> {
    socket: Option<S>,
}

impl<S> NullTimeout<S> {
    pub fn new() -> Self {
        Self { socket: None }
    }
}

impl<S> Default for NullTimeout<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Socket> TimeoutPolicy for NullTimeout<S> {
    type Socket = S;

    async fn connect<C>(&mut self, connector: &C, host: &str, port: u16) -> Result<()>
    where
        C: Connector<Socket = Self::Socket>,
    {
        let socket = connector.open(host, port).await?;
        tracing::debug!(host, port, "Connected without timeout");
        self.socket = Some(socket);
        Ok(())
    }

    async fn connect_secure(&mut self) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        socket.handshake().await?;
        Ok(())
    }

    async fn read_partial(&mut self, max: usize) -> Result<Chunk> {
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        if max == 0 {
            return Ok(Chunk::Data(Bytes::new()));
        }
        let mut buf = vec![0u8; max.min(MAX_READ_SIZE)];
        match socket.read(&mut buf).await? {
            0 => Ok(Chunk::EndOfStream),
            n => {
                buf.truncate(n);
                Ok(Chunk::Data(Bytes::from(buf)))
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<Written> {
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        match socket.write_all(data).await {
            Ok(()) => Ok(Written::Complete),
            Err(e) if e.kind() == io::ErrorKind::WriteZero => Ok(Written::EndOfStream),
            Err(e) => Err(e.into()),
        }
    }

    fn socket(&self) -> Option<&S> {
        self.socket.as_ref()
    }

    fn take_socket(&mut self) -> Option<S> {
        self.socket.take()
    }
}
