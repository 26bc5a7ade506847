//! Shared utilities for integration tests: scripted TCP backends.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use sluice::config::TimeoutConfig;
use sluice::net::{TcpConnector, TcpSocket};
use sluice::{Connection, Timeout};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

/// One scripted response: body chunks written with `pause` before each.
#[derive(Clone)]
pub struct Reply {
    pub chunks: Vec<&'static [u8]>,
    pub pause: Duration,
}

impl Reply {
    pub fn new(chunks: Vec<&'static [u8]>) -> Self {
        Self {
            chunks,
            pause: Duration::from_millis(20),
        }
    }

    pub fn paused(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

/// Read until the end of a request head. Returns false if the peer hung up.
async fn read_request(socket: &mut TcpStream) -> bool {
    let mut seen = Vec::new();
    let mut buf = [0u8; 1024];
    while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => seen.extend_from_slice(&buf[..n]),
        }
    }
    true
}

/// Start a backend serving `replies` in order on a single accepted
/// connection, one per request. Closes the socket when `close` is set,
/// otherwise holds it open until the client hangs up.
pub async fn start_backend(replies: Vec<Reply>, close: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(_) => return,
        };
        for reply in replies {
            if !read_request(&mut socket).await {
                return;
            }
            for chunk in reply.chunks {
                tokio::time::sleep(reply.pause).await;
                if socket.write_all(chunk).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
            }
        }
        if close {
            let _ = socket.shutdown().await;
            return;
        }
        let mut buf = [0u8; 1024];
        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    });

    addr
}

/// Start a backend that accepts and never writes a byte.
pub async fn start_silent_backend() -> SocketAddr {
    start_backend(vec![], false).await
}

/// Open a plain TCP connection under the given timeouts.
pub async fn connect(
    addr: SocketAddr,
    timeouts: &TimeoutConfig,
) -> Connection<Timeout<TcpSocket>> {
    Connection::open(
        Timeout::from_config(timeouts),
        &TcpConnector::new(),
        &addr.ip().to_string(),
        addr.port(),
    )
    .await
    .expect("connect to test backend")
}

fn ring_provider() -> Arc<rustls::crypto::CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn generate_self_signed() -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let key = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());
    (vec![CertificateDer::from(cert.cert)], key.into())
}

/// Client config that trusts exactly `certs`.
pub fn trusting_client_config(certs: &[CertificateDer<'static>]) -> Arc<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in certs {
        roots.add(cert.clone()).unwrap();
    }
    let config = rustls::ClientConfig::builder_with_provider(ring_provider())
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Arc::new(config)
}

/// A TLS backend on a blocking thread, with a fresh self-signed
/// certificate for `localhost`.
pub struct TlsBackend {
    pub addr: SocketAddr,
    pub certs: Vec<CertificateDer<'static>>,
}

/// Accept one TLS connection, read one request head, answer with `body`,
/// then send close_notify and wait for the client to hang up.
pub fn start_tls_backend(body: Vec<u8>) -> TlsBackend {
    let (certs, key) = generate_self_signed();
    let config = rustls::ServerConfig::builder_with_provider(ring_provider())
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(certs.clone(), key)
        .unwrap();
    let config = Arc::new(config);

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let Ok((tcp, _)) = listener.accept() else {
            return;
        };
        let Ok(session) = rustls::ServerConnection::new(config) else {
            return;
        };
        let mut stream = rustls::StreamOwned::new(session, tcp);

        let mut seen = Vec::new();
        let mut buf = [0u8; 4096];
        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => seen.extend_from_slice(&buf[..n]),
            }
        }
        if stream.write_all(&body).is_err() {
            return;
        }
        stream.conn.send_close_notify();
        let _ = stream.flush();
        while let Ok(n) = stream.read(&mut buf) {
            if n == 0 {
                break;
            }
        }
    });

    TlsBackend { addr, certs }
}
