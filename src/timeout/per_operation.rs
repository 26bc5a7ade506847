//! Independent connect, read and write deadlines over non-blocking primitives.

use std::io;
use std::time::Duration;

use bytes::Bytes;

use crate::config::TimeoutConfig;
use crate::error::{Error, Operation, Result};
use crate::net::{Connector, Handshake, Socket};
use crate::timeout::{timed_out, wait_ready, Chunk, TimeoutPolicy, Written, MAX_READ_SIZE};

/// Bounds each socket operation separately.
///
/// Reads and writes try the non-blocking primitive first and only wait when
/// it reports `WouldBlock`. Each wait gets the full bound again, so a body
/// that trickles in keeps succeeding as long as no single gap exceeds it.
#[derive(Debug)]
pub struct PerOperationTimeout<S> {
    connect_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
    socket: Option<S>,
}

impl<S> PerOperationTimeout<S> {
    pub fn new(config: &TimeoutConfig) -> Self {
        Self {
            connect_timeout: config.connect(),
            read_timeout: config.read(),
            write_timeout: config.write(),
            socket: None,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }
}

impl<S> Default for PerOperationTimeout<S> {
    fn default() -> Self {
        Self::new(&TimeoutConfig::default())
    }
}

impl<S: Socket> TimeoutPolicy for PerOperationTimeout<S> {
    type Socket = S;

    async fn connect<C>(&mut self, connector: &C, host: &str, port: u16) -> Result<()>
    where
        C: Connector<Socket = Self::Socket>,
    {
        let limit = self.connect_timeout;
        let socket = match tokio::time::timeout(limit, connector.open(host, port)).await {
            Ok(result) => result?,
            Err(_) => return Err(timed_out(Operation::Connect, limit)),
        };
        tracing::debug!(
            host,
            port,
            connect_ms = limit.as_millis() as u64,
            read_ms = self.read_timeout.as_millis() as u64,
            write_ms = self.write_timeout.as_millis() as u64,
            "Connected"
        );
        self.socket = Some(socket);
        Ok(())
    }

    async fn connect_secure(&mut self) -> Result<()> {
        let (read_limit, write_limit) = (self.read_timeout, self.write_timeout);
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        loop {
            match socket.try_handshake() {
                Ok(Handshake::Complete) => {
                    tracing::debug!("Handshake complete");
                    return Ok(());
                }
                Ok(Handshake::WantRead) => {
                    wait_ready(socket.readable(), Operation::Handshake, read_limit).await?
                }
                Ok(Handshake::WantWrite) => {
                    wait_ready(socket.writable(), Operation::Handshake, write_limit).await?
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn read_partial(&mut self, max: usize) -> Result<Chunk> {
        let limit = self.read_timeout;
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        if max == 0 {
            return Ok(Chunk::Data(Bytes::new()));
        }
        let mut buf = vec![0u8; max.min(MAX_READ_SIZE)];
        loop {
            match socket.try_read(&mut buf) {
                Ok(0) => return Ok(Chunk::EndOfStream),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Chunk::Data(Bytes::from(buf)));
                }
                // Readiness can be spurious; always go back and try again.
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    wait_ready(socket.readable(), Operation::Read, limit).await?
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<Written> {
        let limit = self.write_timeout;
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        let mut remaining = data;
        while !remaining.is_empty() {
            match socket.try_write(remaining) {
                Ok(0) => return Ok(Written::EndOfStream),
                Ok(n) => remaining = &remaining[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    wait_ready(socket.writable(), Operation::Write, limit).await?
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        loop {
            match socket.try_flush() {
                Ok(()) => return Ok(Written::Complete),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    wait_ready(socket.writable(), Operation::Write, limit).await?
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn socket(&self) -> Option<&S> {
        self.socket.as_ref()
    }

    fn take_socket(&mut self) -> Option<S> {
        self.socket.take()
    }
}
