use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Generic
    #[error("Operation aborted")]
    Aborted,
    #[error("Operation timed out")]
    TimedOut,

    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Internet disconnected")]
    InternetDisconnected,
    #[error("Address invalid")]
    AddressInvalid,
    #[error("Address unreachable")]
    AddressUnreachable,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Network access denied")]
    NetworkAccessDenied,
    #[error("Address in use")]
    AddressInUse,

    // URL Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,

    // Context-rich errors
    #[error("Connection to {addr} failed: {source}")]
    ConnectionFailedTo {
        addr: SocketAddr,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Local interface query failed: {source}")]
    InterfaceQueryFailed {
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::Aborted => -3,
            NetError::TimedOut => -7,
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::InternetDisconnected => -106,
            NetError::AddressInvalid => -108,
            NetError::AddressUnreachable => -109,
            NetError::ConnectionTimedOut => -118,
            NetError::NetworkAccessDenied => -138,
            NetError::AddressInUse => -147,

            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,

            // Context-rich variants report the code of their plain counterpart
            NetError::ConnectionFailedTo { .. } => -104,
            // Custom codes (outside Chromium's ranges)
            NetError::InterfaceQueryFailed { .. } => -10001,
            NetError::InvalidConfig(_) => -10002,
            NetError::Unknown(code) => *code,
        }
    }

    /// Classify an IO error from a connect call.
    ///
    /// Kinds without a dedicated variant become [`NetError::ConnectionFailedTo`]
    /// so the original error is kept for diagnostics.
    pub fn from_connect_error(addr: SocketAddr, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
            io::ErrorKind::ConnectionAborted => NetError::ConnectionAborted,
            io::ErrorKind::NotConnected => NetError::ConnectionClosed,
            io::ErrorKind::AddrInUse => NetError::AddressInUse,
            io::ErrorKind::AddrNotAvailable => NetError::AddressInvalid,
            io::ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            io::ErrorKind::PermissionDenied => NetError::NetworkAccessDenied,
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                NetError::AddressUnreachable
            }
            io::ErrorKind::NetworkDown => NetError::InternetDisconnected,
            _ => NetError::ConnectionFailedTo {
                addr,
                source: Arc::new(err),
            },
        }
    }

    /// Returns true if this error reports an abandoned operation rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, NetError::Aborted)
    }
}

impl PartialEq for NetError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                NetError::ConnectionFailedTo { addr: a, .. },
                NetError::ConnectionFailedTo { addr: b, .. },
            ) => a == b,
            (NetError::InterfaceQueryFailed { .. }, NetError::InterfaceQueryFailed { .. }) => true,
            (NetError::InvalidConfig(a), NetError::InvalidConfig(b)) => a == b,
            (NetError::Unknown(a), NetError::Unknown(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -3 => NetError::Aborted,
            -7 => NetError::TimedOut,
            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -106 => NetError::InternetDisconnected,
            -108 => NetError::AddressInvalid,
            -109 => NetError::AddressUnreachable,
            -118 => NetError::ConnectionTimedOut,
            -138 => NetError::NetworkAccessDenied,
            -147 => NetError::AddressInUse,

            -300 => NetError::InvalidUrl,
            -302 => NetError::UnknownUrlScheme,
            _ => NetError::Unknown(code),
        }
    }
}
