//! Single-port connection multiplexer.
//!
//! One TCP listener feeds two servers: each accepted connection is sniffed
//! with `peek` (no bytes are consumed) and handed to the gRPC side when it
//! opens with the HTTP/2 client preface, otherwise to the HTTP/1.1 side.
//! The sub-listeners are mpsc channels; [`QueueListener`] adapts the HTTP
//! channel to `axum::serve` and the gRPC channel feeds
//! `serve_with_incoming` as a stream.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// First bytes of the HTTP/2 client connection preface
/// (`PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n`). The method/version line is enough
/// to tell it apart from any HTTP/1.1 request.
const H2_PREFACE: &[u8; 14] = b"PRI * HTTP/2.0";

const PEEK_ATTEMPTS: u32 = 8;
const PEEK_RETRY: Duration = Duration::from_millis(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http1,
    Http2,
}

/// Classifies a peeked prefix; `None` means the bytes so far are consistent
/// with the preface but too short to decide.
fn classify(buf: &[u8]) -> Option<Protocol> {
    let n = buf.len().min(H2_PREFACE.len());
    if buf[..n] != H2_PREFACE[..n] {
        return Some(Protocol::Http1);
    }
    if buf.len() >= H2_PREFACE.len() {
        return Some(Protocol::Http2);
    }
    None
}

/// Peeks at the first bytes of the connection without consuming them.
///
/// A client that matches the preface prefix but stalls mid-write is retried
/// a few times and then treated as HTTP/1.1, where it will fail to parse.
async fn sniff(stream: &TcpStream) -> io::Result<Protocol> {
    let mut buf = [0u8; H2_PREFACE.len()];
    for _ in 0..PEEK_ATTEMPTS {
        let n = stream.peek(&mut buf).await?;
        if n == 0 {
            // Peer closed before sending anything.
            return Ok(Protocol::Http1);
        }
        if let Some(protocol) = classify(&buf[..n]) {
            return Ok(protocol);
        }
        tokio::time::sleep(PEEK_RETRY).await;
    }
    Ok(Protocol::Http1)
}

/// Accept loop dispatching connections to the two sub-listeners.
pub struct ConnectionMux {
    listener: TcpListener,
    http_tx: mpsc::Sender<TcpStream>,
    grpc_tx: mpsc::Sender<io::Result<TcpStream>>,
    shutdown: CancellationToken,
}

impl ConnectionMux {
    #[must_use]
    pub fn new(
        listener: TcpListener,
        http_tx: mpsc::Sender<TcpStream>,
        grpc_tx: mpsc::Sender<io::Result<TcpStream>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            listener,
            http_tx,
            grpc_tx,
            shutdown,
        }
    }

    /// Runs until cancelled. Sniffing happens on a task per connection so a
    /// slow client cannot stall the accept loop.
    pub async fn run(self) {
        loop {
            let (stream, peer) = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };
            let http_tx = self.http_tx.clone();
            let grpc_tx = self.grpc_tx.clone();
            tokio::spawn(async move {
                match sniff(&stream).await {
                    Ok(Protocol::Http2) => {
                        if grpc_tx.send(Ok(stream)).await.is_err() {
                            tracing::debug!(%peer, "grpc server gone, dropping connection");
                        }
                    }
                    Ok(Protocol::Http1) => {
                        if http_tx.send(stream).await.is_err() {
                            tracing::debug!(%peer, "http server gone, dropping connection");
                        }
                    }
                    Err(e) => {
                        tracing::debug!(%peer, error = %e, "connection sniff failed");
                    }
                }
            });
        }
        tracing::debug!("mux accept loop stopped");
    }
}

/// Channel-backed listener for the HTTP side of the mux.
pub struct QueueListener {
    rx: mpsc::Receiver<TcpStream>,
    local_addr: SocketAddr,
}

impl QueueListener {
    #[must_use]
    pub fn new(rx: mpsc::Receiver<TcpStream>, local_addr: SocketAddr) -> Self {
        Self { rx, local_addr }
    }
}

impl axum::serve::Listener for QueueListener {
    type Io = TcpStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        match self.rx.recv().await {
            Some(stream) => {
                let peer = stream.peer_addr().unwrap_or(self.local_addr);
                (stream, peer)
            }
            // The mux stopped; park until graceful shutdown tears the
            // server down.
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}
