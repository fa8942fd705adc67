// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connecting to and listening on handshake addresses.

use std::io;

use async_trait::async_trait;
use futures::Stream;
use tether_core::{HostDialer, TetherError};
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};

use crate::handshake::{Address, Network};

/// Connect to a plugin or host at `address`.
pub async fn connect(address: &Address) -> Result<Channel, tonic::transport::Error> {
    match address.network {
        Network::Tcp => {
            Endpoint::from_shared(format!("http://{}", address.address))?
                .connect()
                .await
        }
        Network::Unix => connect_unix(address.address.clone()).await,
    }
}

#[cfg(unix)]
async fn connect_unix(path: String) -> Result<Channel, tonic::transport::Error> {
    use hyper_util::rt::TokioIo;
    use tokio::net::UnixStream;
    use tower::service_fn;

    Endpoint::from_static("http://tether.unix")
        .connect_with_connector(service_fn(move |_: http::Uri| {
            let path = path.clone();
            async move { Ok::<_, io::Error>(TokioIo::new(UnixStream::connect(path).await?)) }
        }))
        .await
}

#[cfg(not(unix))]
async fn connect_unix(path: String) -> Result<Channel, tonic::transport::Error> {
    use tower::service_fn;

    Endpoint::from_static("http://tether.unix")
        .connect_with_connector(service_fn(move |_: http::Uri| {
            let path = path.clone();
            async move {
                Err::<hyper_util::rt::TokioIo<tokio::net::TcpStream>, _>(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unix sockets are not supported here: {path}"),
                ))
            }
        }))
        .await
}

/// A bound listener plus the address peers should dial.
pub struct Listener<S> {
    pub address: Address,
    pub incoming: S,
    /// Keeps the socket directory alive as long as the listener.
    pub dir: Option<tempfile::TempDir>,
}

/// Listen on a fresh socket in a private temporary directory.
#[cfg(unix)]
pub fn listen(
    file_name: &str,
) -> io::Result<Listener<impl Stream<Item = io::Result<tokio::net::UnixStream>> + Send + 'static>> {
    let dir = tempfile::Builder::new().prefix("tether-").tempdir()?;
    let path = dir.path().join(file_name);
    let listener = tokio::net::UnixListener::bind(&path)?;
    Ok(Listener {
        address: Address::new(Network::Unix, path.to_string_lossy()),
        incoming: tokio_stream::wrappers::UnixListenerStream::new(listener),
        dir: Some(dir),
    })
}

/// Listen on an ephemeral loopback port.
#[cfg(not(unix))]
pub fn listen(
    _file_name: &str,
) -> io::Result<Listener<impl Stream<Item = io::Result<tokio::net::TcpStream>> + Send + 'static>> {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    std_listener.set_nonblocking(true)?;
    let address = std_listener.local_addr()?;
    let listener = tokio::net::TcpListener::from_std(std_listener)?;
    Ok(Listener {
        address: Address::new(Network::Tcp, address.to_string()),
        incoming: tokio_stream::wrappers::TcpListenerStream::new(listener),
        dir: None,
    })
}

/// Dials the host services server once and hands out the same channel after.
pub struct CachedHostDialer {
    address: Option<Address>,
    channel: Mutex<Option<Channel>>,
}

impl CachedHostDialer {
    pub fn new(address: Option<Address>) -> Self {
        Self {
            address,
            channel: Mutex::new(None),
        }
    }
}

#[async_trait]
impl HostDialer for CachedHostDialer {
    async fn dial_host(&self) -> Result<Channel, TetherError> {
        let mut cached = self.channel.lock().await;
        if let Some(channel) = cached.as_ref() {
            return Ok(channel.clone());
        }
        let address = self
            .address
            .as_ref()
            .ok_or_else(|| TetherError::Config("host did not provide a services address".into()))?;
        let channel = connect(address).await.map_err(|e| TetherError::Transport {
            plugin: "host".into(),
            message: format!("failed to dial host services at {}", address.to_env()),
            source: Some(Box::new(e)),
        })?;
        *cached = Some(channel.clone());
        Ok(channel)
    }
}
