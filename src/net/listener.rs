//! TCP listener with keepalive-based dead-peer detection.
//!
//! # Responsibilities
//! - Resolve and bind the configured host:port with SO_REUSEADDR
//! - Enable TCP keepalive on the listening socket and every accepted socket
//! - Accept incoming connections

use std::io;
use std::net::SocketAddr;

use socket2::{SockRef, TcpKeepalive};
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::config::{KeepaliveConfig, ListenerConfig};

/// Error type for listener operations. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to resolve {target}: {source}")]
    Resolve { target: String, source: io::Error },

    #[error("{target} did not resolve to any address")]
    NoAddress { target: String },

    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
}

/// Apply keepalive settings to a socket.
///
/// Probe interval and count are only tunable on some platforms; elsewhere
/// only the idle time is set and the OS defaults apply.
pub fn apply_keepalive(socket: SockRef<'_>, config: &KeepaliveConfig) -> io::Result<()> {
    let params = TcpKeepalive::new().with_time(config.idle());

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
    ))]
    let params = params
        .with_interval(config.interval())
        .with_retries(config.probe_count);

    socket.set_tcp_keepalive(&params)
}

/// The passive socket microphone clients connect to.
pub struct Acceptor {
    inner: TcpListener,
    keepalive: KeepaliveConfig,
}

impl Acceptor {
    /// Bind to the configured address.
    pub async fn bind(listener: &ListenerConfig, keepalive: &KeepaliveConfig) -> Result<Self, ListenerError> {
        let target = listener.bind_target();
        let addr = tokio::net::lookup_host(&target)
            .await
            .map_err(|source| ListenerError::Resolve {
                target: target.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| ListenerError::NoAddress { target: target.clone() })?;

        let bind_err = |source| ListenerError::Bind { addr, source };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;

        if let Err(e) = apply_keepalive(SockRef::from(&socket), keepalive) {
            tracing::warn!(error = %e, "Failed to enable keepalive on listener");
        }

        socket.bind(addr).map_err(bind_err)?;
        let inner = socket.listen(listener.backlog).map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        tracing::info!(
            address = %local_addr,
            max_clients = listener.max_clients,
            keepalive_idle_secs = keepalive.idle_secs,
            keepalive_interval_secs = keepalive.interval_secs,
            keepalive_probes = keepalive.probe_count,
            "Listener bound"
        );

        Ok(Self {
            inner,
            keepalive: keepalive.clone(),
        })
    }

    /// Accept a new connection and enable keepalive on it.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.inner.accept().await?;

        if let Err(e) = apply_keepalive(SockRef::from(&stream), &self.keepalive) {
            tracing::warn!(peer_addr = %peer, error = %e, "Failed to enable keepalive on connection");
        }

        tracing::debug!(peer_addr = %peer, "Connection accepted");
        Ok((stream, peer))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
