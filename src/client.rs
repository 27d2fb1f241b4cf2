//! Connection client with builder pattern.
//!
//! Provides a configured, high-level entry point over [`ConnectRacer`]:
//! the race timeout and straggler handling are set once, and each call only
//! supplies the candidate addresses.
//!
//! # Example
//!
//! ```rust,ignore
//! use netrace::Client;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = Client::builder()
//!     .timeout(Duration::from_secs(2))
//!     .build()?;
//!
//! let addrs = ["192.168.1.20".parse()?, "10.0.0.5".parse()?];
//! let cancel = CancellationToken::new();
//! if let Some(winner) = client.connect(addrs, 11338, &cancel).await.into_result()? {
//!     println!("connected to {}", winner.addr());
//! }
//! ```

use crate::base::neterror::NetError;
use crate::endpoint::Endpoint;
use crate::socket::racer::{ConnectRacer, RaceConfig, RaceOutcome};
use crate::socket::reaper::StragglerPolicy;
use crate::socket::scope::saturating_millis;
use crate::socket::stream::{Connector, TcpConnector};
use std::net::IpAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Client for racing connections.
///
/// Use [`Client::builder()`] to configure a TCP client, or
/// [`Client::with_connector`] to race over another transport.
#[derive(Clone, Debug)]
pub struct Client<C: Connector = TcpConnector> {
    racer: ConnectRacer<C>,
    config: RaceConfig,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new TCP client with default settings.
    pub fn new() -> Self {
        Self::with_connector(TcpConnector::new(), RaceConfig::default())
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }
}

impl<C: Connector> Client<C> {
    /// Create a client over a custom transport.
    pub fn with_connector(connector: C, config: RaceConfig) -> Self {
        Self {
            racer: ConnectRacer::new(connector).with_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn racer(&self) -> &ConnectRacer<C> {
        &self.racer
    }

    /// Race every address on `port` with the configured timeout.
    pub async fn connect<I>(
        &self,
        addresses: I,
        port: u16,
        cancel: &CancellationToken,
    ) -> RaceOutcome<C::Socket>
    where
        I: IntoIterator<Item = IpAddr>,
    {
        self.racer
            .race(addresses, port, self.config.timeout(), cancel)
            .await
    }

    /// Race every address on the port named by `url`.
    ///
    /// The URL's host is not resolved; `addresses` are its already-resolved
    /// candidates.
    pub async fn connect_url<I>(
        &self,
        url: &str,
        addresses: I,
        cancel: &CancellationToken,
    ) -> Result<RaceOutcome<C::Socket>, NetError>
    where
        I: IntoIterator<Item = IpAddr>,
    {
        let endpoint = Endpoint::parse(url)?;
        tracing::debug!(host = %endpoint.host, port = endpoint.port, "connecting to URL endpoint");
        Ok(self.connect(addresses, endpoint.port, cancel).await)
    }
}

/// Builder for creating a TCP [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    config: Option<RaceConfig>,
    timeout: Option<Duration>,
    straggler_policy: Option<StragglerPolicy>,
    straggler_grace: Option<Duration>,
    nodelay: Option<bool>,
}

impl ClientBuilder {
    /// Start from a full configuration. Individual setters still override it.
    pub fn config(mut self, config: RaceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the overall race deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set how connections that lose the race are closed.
    pub fn straggler_policy(mut self, policy: StragglerPolicy) -> Self {
        self.straggler_policy = Some(policy);
        self
    }

    /// Set the upper bound on straggler cleanup.
    pub fn straggler_grace(mut self, grace: Duration) -> Self {
        self.straggler_grace = Some(grace);
        self
    }

    /// Set `TCP_NODELAY` on connected streams (default: true).
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = Some(enabled);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, NetError> {
        let mut config = self.config.unwrap_or_default();
        if let Some(timeout) = self.timeout {
            config.timeout_ms = saturating_millis(timeout);
        }
        if let Some(policy) = self.straggler_policy {
            config.straggler_policy = policy;
        }
        if let Some(grace) = self.straggler_grace {
            config.straggler_grace_ms = saturating_millis(grace);
        }
        config.validate()?;

        let connector = TcpConnector::new().nodelay(self.nodelay.unwrap_or(true));
        Ok(Client::with_connector(connector, config))
    }
}
