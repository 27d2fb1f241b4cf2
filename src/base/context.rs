//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into context-rich `NetError` variants.

use crate::base::neterror::NetError;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Classify a connect error against the address that was dialed.
    ///
    /// # Example
    /// ```ignore
    /// use netrace::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await.connect_context(addr)?;
    /// // Refused connections map to NetError::ConnectionRefused, and so on.
    /// ```
    fn connect_context(self, addr: SocketAddr) -> Result<T, NetError>;

    /// Wrap an error from the OS interface query.
    fn interface_context(self) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connect_context(self, addr: SocketAddr) -> Result<T, NetError> {
        self.map_err(|e| NetError::from_connect_error(addr, e))
    }

    fn interface_context(self) -> Result<T, NetError> {
        self.map_err(|e| NetError::InterfaceQueryFailed {
            source: Arc::new(e),
        })
    }
}
