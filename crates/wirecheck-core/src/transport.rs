//! Connection setup — one listener accepting one peer, or one dial.
//!
//! No handshake is exchanged. Once the stream exists the session starts.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::TransportError;

/// Which end of the connection this process is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Listen on `listen` and serve the first peer that connects.
    Server { listen: String },
    /// Dial `connect` (host:port).
    Client { connect: String },
}

pub async fn listen(addr: &str) -> Result<TcpListener, TransportError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TransportError::Bind(addr.to_string(), e))?;
    if let Ok(local) = listener.local_addr() {
        tracing::info!(addr = %local, "listening");
    }
    Ok(listener)
}

/// Accept exactly one peer. The listener is not used again.
pub async fn accept_one(listener: &TcpListener) -> Result<(TcpStream, SocketAddr), TransportError> {
    let (stream, peer) = listener.accept().await.map_err(TransportError::Accept)?;
    tracing::info!(peer = %peer, "received connection");
    configure(&stream);
    Ok((stream, peer))
}

pub async fn dial(host_port: &str) -> Result<(TcpStream, SocketAddr), TransportError> {
    let stream = TcpStream::connect(host_port)
        .await
        .map_err(|e| TransportError::Connect(host_port.to_string(), e))?;
    let peer = stream
        .peer_addr()
        .map_err(|e| TransportError::Connect(host_port.to_string(), e))?;
    tracing::info!(peer = %peer, "connected");
    configure(&stream);
    Ok((stream, peer))
}

/// Resolve a role into an established connection.
pub async fn establish(role: &Role) -> Result<(TcpStream, SocketAddr), TransportError> {
    match role {
        Role::Server { listen: addr } => {
            let listener = listen(addr).await?;
            accept_one(&listener).await
        }
        Role::Client { connect } => dial(connect).await,
    }
}

fn configure(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(error = %e, "failed to set TCP_NODELAY");
    }
}
