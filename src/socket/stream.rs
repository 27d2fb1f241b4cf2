//! Transport abstraction for connection attempts.
//!
//! The racer never touches sockets directly. It asks a [`Connector`] to open
//! a handle to one address and, for losers, to close it again. This is the
//! seam that lets the same race logic drive plain TCP in production and a
//! counting fake in tests.
//!
//! Based on Chromium's `ClientSocketFactory`, which hands out
//! `StreamSocket`s to connect jobs.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Alias for the `Future` returned by [`Connector::connect`].
pub type Connecting<S> = BoxFuture<'static, Result<S, NetError>>;

/// Alias for the `Future` returned by [`Connector::close`].
pub type Closing = BoxFuture<'static, io::Result<()>>;

/// Opens and closes transport connections.
///
/// Implementations must be thread-safe; one connector is shared by every
/// attempt of a race.
///
/// # Design Notes
///
/// - `connect` must not hold any resource once its future is dropped.
///   Attempts are cancelled by dropping the future.
/// - `close` consumes the handle. It is only called for connections that
///   lost the race.
pub trait Connector: Send + Sync + 'static {
    /// The open connection handle.
    type Socket: Send + 'static;

    /// Opens a new connection to `addr`.
    fn connect(&self, addr: SocketAddr) -> Connecting<Self::Socket>;

    /// Closes a connection nobody will use.
    fn close(&self, socket: Self::Socket) -> Closing;
}

/// Blanket implementation for Arc-wrapped connectors.
impl<C: Connector + ?Sized> Connector for Arc<C> {
    type Socket = C::Socket;

    fn connect(&self, addr: SocketAddr) -> Connecting<Self::Socket> {
        (**self).connect(addr)
    }

    fn close(&self, socket: Self::Socket) -> Closing {
        (**self).close(socket)
    }
}

/// Plain TCP connector backed by `tokio::net::TcpStream`.
#[derive(Clone)]
pub struct TcpConnector {
    nodelay: bool,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpConnector {
    /// Creates a connector with `TCP_NODELAY` enabled.
    pub fn new() -> Self {
        Self { nodelay: true }
    }

    /// Set `TCP_NODELAY` on every connected stream.
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// Returns whether `TCP_NODELAY` is applied.
    pub fn is_nodelay(&self) -> bool {
        self.nodelay
    }
}

impl Connector for TcpConnector {
    type Socket = TcpStream;

    fn connect(&self, addr: SocketAddr) -> Connecting<TcpStream> {
        let nodelay = self.nodelay;
        async move {
            let stream = TcpStream::connect(addr).await.connect_context(addr)?;
            if nodelay {
                // Not fatal: the connection is still usable without it
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(peer = %addr, error = %e, "failed to set TCP_NODELAY");
                }
            }
            Ok(stream)
        }
        .boxed()
    }

    fn close(&self, mut socket: TcpStream) -> Closing {
        async move {
            // Send FIN before the descriptor is released on drop
            socket.shutdown().await
        }
        .boxed()
    }
}

impl fmt::Debug for TcpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpConnector")
            .field("nodelay", &self.nodelay)
            .finish()
    }
}
