// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory network for serving gRPC inside the host process.
//!
//! Each dial creates a [`DuplexStream`] pair and hands the server half to the
//! listener, which tonic consumes like any other incoming connection stream.

use std::io;

use futures::{Stream, StreamExt};
use hyper_util::rt::TokioIo;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tower::service_fn;

/// Per-direction buffer of a pipe connection.
pub const PIPE_BUFFER_SIZE: usize = 64 * 1024;

/// Create a connected dialer/listener pair.
pub fn pipe_net() -> (PipeDialer, PipeListener) {
    let (tx, rx) = mpsc::unbounded_channel();
    let closed = CancellationToken::new();
    (
        PipeDialer {
            tx,
            closed: closed.clone(),
        },
        PipeListener { rx, closed },
    )
}

#[derive(Debug, Clone)]
pub struct PipeDialer {
    tx: mpsc::UnboundedSender<DuplexStream>,
    closed: CancellationToken,
}

impl PipeDialer {
    /// Open a new connection to the listener.
    pub fn dial(&self) -> io::Result<DuplexStream> {
        if self.closed.is_cancelled() {
            return Err(closed_error());
        }
        let (client, server) = tokio::io::duplex(PIPE_BUFFER_SIZE);
        self.tx.send(server).map_err(|_| closed_error())?;
        Ok(client)
    }

    /// A lazily connecting gRPC channel that dials through this pipe.
    pub fn channel(&self) -> Channel {
        let dialer = self.clone();
        Endpoint::from_static("http://tether.pipe").connect_with_connector_lazy(service_fn(
            move |_: http::Uri| {
                let conn = dialer.dial().map(TokioIo::new);
                async move { conn }
            },
        ))
    }
}

pub struct PipeListener {
    rx: mpsc::UnboundedReceiver<DuplexStream>,
    closed: CancellationToken,
}

impl PipeListener {
    /// Token that closes the listener when cancelled.
    pub fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Incoming connections, ending once the listener is closed.
    pub fn incoming(self) -> impl Stream<Item = io::Result<DuplexStream>> + Send + 'static {
        let closed = self.closed;
        UnboundedReceiverStream::new(self.rx)
            .map(Ok)
            .take_until(async move { closed.cancelled().await })
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionRefused, "pipe listener closed")
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn dial_reaches_listener() {
        let (dialer, listener) = pipe_net();
        let mut incoming = Box::pin(listener.incoming());

        let mut client = dialer.dial().unwrap();
        let mut server = incoming.next().await.unwrap().unwrap();

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn closed_listener_refuses_dials_and_ends_stream() {
        let (dialer, listener) = pipe_net();
        let token = listener.close_token();
        let mut incoming = Box::pin(listener.incoming());

        token.cancel();
        let err = dialer.dial().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
        assert!(incoming.next().await.is_none());
    }
}
