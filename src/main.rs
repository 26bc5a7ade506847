//! `sluice`: fetch a resource over a timeout-bounded connection and stream
//! the raw response to stdout.

use std::path::PathBuf;

use clap::Parser;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use sluice::config::{load_config, validate_config, ConfigError};
use sluice::net::{Connector, TcpConnector, TcpSocket, TlsConnector, TlsSocket};
use sluice::observability::{logging, metrics};
use sluice::{Body, Connection, Framing, SluiceConfig, Timeout, TimeoutMode, TimeoutPolicy, Written};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Stream a response body over a connection with bounded connect/read/write", long_about = None)]
struct Cli {
    /// Host to connect to.
    host: String,

    /// Port (default 80, or 443 with --tls).
    #[arg(short, long)]
    port: Option<u16>,

    /// Request path.
    #[arg(long, default_value = "/")]
    path: String,

    /// Negotiate TLS after connecting.
    #[arg(long)]
    tls: bool,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Connect timeout in seconds.
    #[arg(long)]
    connect_timeout: Option<f64>,

    /// Read timeout in seconds.
    #[arg(long)]
    read_timeout: Option<f64>,

    /// Write timeout in seconds.
    #[arg(long)]
    write_timeout: Option<f64>,

    /// Use blocking socket operations with no timeout at all.
    #[arg(long)]
    no_timeout: bool,
}

impl Cli {
    fn port(&self) -> u16 {
        self.port.unwrap_or(if self.tls { 443 } else { 80 })
    }

    fn request(&self) -> String {
        format!(
            "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.path, self.host
        )
    }

    fn apply(&self, config: &mut SluiceConfig) {
        if let Some(secs) = self.connect_timeout {
            config.timeouts.connect_secs = secs;
        }
        if let Some(secs) = self.read_timeout {
            config.timeouts.read_secs = secs;
        }
        if let Some(secs) = self.write_timeout {
            config.timeouts.write_secs = secs;
        }
        if self.no_timeout {
            config.timeouts.mode = TimeoutMode::Null;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SluiceConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.logging.filter)?;
    metrics::describe();

    tracing::info!(
        host = %cli.host,
        port = cli.port(),
        tls = cli.tls,
        mode = ?config.timeouts.mode,
        "sluice v0.1.0 starting"
    );

    let bytes = if cli.tls {
        let connector = TlsConnector::with_default_roots()?;
        let policy = Timeout::<TlsSocket>::from_config(&config.timeouts);
        fetch(policy, &connector, &cli, &config).await?
    } else {
        let policy = Timeout::<TcpSocket>::from_config(&config.timeouts);
        fetch(policy, &TcpConnector::new(), &cli, &config).await?
    };

    tracing::info!(bytes, "Response read");
    Ok(())
}

async fn fetch<P, C>(policy: P, connector: &C, cli: &Cli, config: &SluiceConfig) -> sluice::Result<u64>
where
    P: TimeoutPolicy,
    C: Connector<Socket = P::Socket>,
{
    let port = cli.port();
    let conn = if cli.tls {
        Connection::open_secure(policy, connector, &cli.host, port).await?
    } else {
        Connection::open(policy, connector, &cli.host, port).await?
    };
    let mut conn = conn.with_buffer_size(config.body.buffer_size);

    if conn.send(cli.request().as_bytes()).await? == Written::EndOfStream {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "peer closed the connection before the request was written",
        )
        .into());
    }
    conn.begin_response(Framing::UntilClose)?;

    let mut body = Body::new(conn.into_shared())
        .await
        .with_buffer_size(config.body.buffer_size);
    let mut chunks = Box::pin(body.chunks());
    let mut stdout = tokio::io::stdout();
    let mut total = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        total += chunk.len() as u64;
        stdout.write_all(&chunk).await?;
    }
    stdout.flush().await?;
    Ok(total)
}
