//! Scripted socket and connector for policy tests.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::net::{Connector, Handshake, Socket};

/// One scripted result for a read or write attempt.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Data(Vec<u8>),
    Accept(usize),
    WouldBlock,
    Eof,
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    try_reads: AtomicUsize,
    readable_waits: AtomicUsize,
    blocking_reads: AtomicUsize,
    try_writes: AtomicUsize,
    writable_waits: AtomicUsize,
    blocking_writes: AtomicUsize,
    blocking_handshakes: AtomicUsize,
    written: Mutex<Vec<u8>>,
}

impl Counters {
    pub fn try_reads(&self) -> usize {
        self.try_reads.load(Ordering::SeqCst)
    }

    pub fn readable_waits(&self) -> usize {
        self.readable_waits.load(Ordering::SeqCst)
    }

    pub fn blocking_reads(&self) -> usize {
        self.blocking_reads.load(Ordering::SeqCst)
    }

    pub fn try_writes(&self) -> usize {
        self.try_writes.load(Ordering::SeqCst)
    }

    pub fn writable_waits(&self) -> usize {
        self.writable_waits.load(Ordering::SeqCst)
    }

    pub fn blocking_writes(&self) -> usize {
        self.blocking_writes.load(Ordering::SeqCst)
    }

    pub fn blocking_handshakes(&self) -> usize {
        self.blocking_handshakes.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

/// Reads follow `reads`; an empty script means "nothing yet" (WouldBlock,
/// or wait forever for the blocking read). Writes follow `writes`; an empty
/// script accepts everything.
#[derive(Debug)]
pub(crate) struct MockSocket {
    pub reads: VecDeque<Step>,
    pub writes: VecDeque<Step>,
    pub handshake: VecDeque<Handshake>,
    /// When false, readiness waits never resolve.
    pub ready: bool,
    /// Added before every blocking read.
    pub blocking_delay: Duration,
    counters: Arc<Counters>,
}

impl MockSocket {
    pub fn scripted(reads: Vec<Step>) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let socket = Self {
            reads: reads.into(),
            writes: VecDeque::new(),
            handshake: VecDeque::new(),
            ready: true,
            blocking_delay: Duration::ZERO,
            counters: Arc::clone(&counters),
        };
        (socket, counters)
    }

    pub fn never_readable() -> (Self, Arc<Counters>) {
        let (mut socket, counters) = Self::scripted(vec![]);
        socket.ready = false;
        (socket, counters)
    }

    fn fill(&mut self, step: Step, buf: &mut [u8]) -> io::Result<usize> {
        match step {
            Step::Data(mut data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.reads.push_front(Step::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Step::Eof => {
                self.reads.push_front(Step::Eof);
                Ok(0)
            }
            Step::Fail(kind) => Err(kind.into()),
            Step::WouldBlock | Step::Accept(_) => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    async fn wait(&self) -> io::Result<()> {
        if self.ready {
            Ok(())
        } else {
            std::future::pending().await
        }
    }
}

impl Socket for MockSocket {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.counters.try_reads.fetch_add(1, Ordering::SeqCst);
        match self.reads.pop_front() {
            Some(step) => self.fill(step, buf),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.counters.try_writes.fetch_add(1, Ordering::SeqCst);
        let n = match self.writes.pop_front() {
            None => buf.len(),
            Some(Step::Accept(n)) => n.min(buf.len()),
            Some(Step::Eof) => return Ok(0),
            Some(Step::Fail(kind)) => return Err(kind.into()),
            Some(_) => return Err(io::ErrorKind::WouldBlock.into()),
        };
        self.counters.written.lock().unwrap().extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn try_handshake(&mut self) -> io::Result<Handshake> {
        Ok(self.handshake.pop_front().unwrap_or(Handshake::Complete))
    }

    async fn readable(&self) -> io::Result<()> {
        self.counters.readable_waits.fetch_add(1, Ordering::SeqCst);
        self.wait().await
    }

    async fn writable(&self) -> io::Result<()> {
        self.counters.writable_waits.fetch_add(1, Ordering::SeqCst);
        self.wait().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.counters.blocking_reads.fetch_add(1, Ordering::SeqCst);
        if !self.blocking_delay.is_zero() {
            tokio::time::sleep(self.blocking_delay).await;
        }
        loop {
            match self.reads.pop_front() {
                Some(Step::WouldBlock) => continue,
                Some(step) => return self.fill(step, buf),
                None => return std::future::pending().await,
            }
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.counters.blocking_writes.fetch_add(1, Ordering::SeqCst);
        match self.writes.pop_front() {
            Some(Step::Eof) => Err(io::ErrorKind::WriteZero.into()),
            Some(Step::Fail(kind)) => Err(kind.into()),
            _ => {
                self.counters.written.lock().unwrap().extend_from_slice(buf);
                Ok(())
            }
        }
    }

    async fn handshake(&mut self) -> io::Result<()> {
        self.counters.blocking_handshakes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], 80)))
    }
}

/// Hands out one prepared socket, optionally after a delay.
#[derive(Debug)]
pub(crate) struct MockConnector {
    socket: Mutex<Option<MockSocket>>,
    delay: Duration,
}

impl MockConnector {
    pub fn new(socket: MockSocket) -> Self {
        Self {
            socket: Mutex::new(Some(socket)),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Connector for MockConnector {
    type Socket = MockSocket;

    async fn open(&self, _host: &str, _port: u16) -> io::Result<MockSocket> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let socket = self.socket.lock().unwrap().take();
        socket.ok_or_else(|| io::ErrorKind::ConnectionRefused.into())
    }
}
