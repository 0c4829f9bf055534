//! # DemoHelper IO
//!
//! The netcon bridge.
//! The game only opens its console port when launched with
//! `-netconport <port>`, and nothing listens there until it has booted, so
//! the port is polled before the real connection is made.

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("netcon port {addr} did not open within {waited_ms}ms; is the game running with -netconport?")]
    PortNeverOpened { addr: String, waited_ms: u64 },

    #[error("netcon connection to {addr} failed: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// How long to keep polling a closed port, and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patience {
    pub window: Duration,
    pub interval: Duration,
}

impl Patience {
    /// For a game that may still be launching.
    pub fn patient(window: Duration) -> Self {
        Self {
            window,
            interval: Duration::from_millis(100),
        }
    }

    /// For a port that should already be open.
    pub fn impatient() -> Self {
        Self {
            window: Duration::from_secs(1),
            interval: Duration::from_millis(50),
        }
    }
}

/// The two halves of a live netcon connection.
#[derive(Debug)]
pub struct NetconStream {
    pub reader: OwnedReadHalf,
    pub writer: OwnedWriteHalf,
}

impl NetconStream {
    fn from_stream(stream: TcpStream) -> Self {
        // Console commands are tiny; don't let Nagle hold them back.
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();
        Self { reader, writer }
    }
}

async fn probe(addr: &str) -> std::io::Result<TcpStream> {
    TcpStream::connect(addr).await
}

/// Poll `addr` until something accepts a connection or `patience` runs out.
pub async fn wait_for_port(addr: &str, patience: Patience) -> Result<(), TransportError> {
    poll_until_open(addr, patience).await.map(drop)
}

async fn poll_until_open(addr: &str, patience: Patience) -> Result<TcpStream, TransportError> {
    let started = Instant::now();
    let deadline = started + patience.window;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining.max(patience.interval), probe(addr)).await {
            Ok(Ok(stream)) => {
                debug!(addr, attempts, "netcon port is open");
                return Ok(stream);
            }
            Ok(Err(e)) => debug!(addr, attempts, error = %e, "netcon port not open yet"),
            Err(_) => debug!(addr, attempts, "netcon probe timed out"),
        }

        if Instant::now() + patience.interval > deadline {
            return Err(TransportError::PortNeverOpened {
                addr: addr.to_string(),
                waited_ms: started.elapsed().as_millis() as u64,
            });
        }
        tokio::time::sleep(patience.interval).await;
    }
}

/// Connect to an open netcon port.
pub async fn connect(addr: &str) -> Result<NetconStream, TransportError> {
    let stream = probe(addr).await.map_err(|source| TransportError::Io {
        addr: addr.to_string(),
        source,
    })?;
    info!("Connected to netcon at {}", addr);
    Ok(NetconStream::from_stream(stream))
}

/// Wait for the port, then keep the first connection that succeeds.
pub async fn connect_when_ready(addr: &str, patience: Patience) -> Result<NetconStream, TransportError> {
    info!(
        "Waiting up to {}s for the game to open netcon at {}",
        patience.window.as_secs(),
        addr
    );
    let stream = poll_until_open(addr, patience).await?;
    info!("Connected to netcon at {}", addr);
    Ok(NetconStream::from_stream(stream))
}
