//! Concurrent multi-address connection racing.
//!
//! Given every resolved address of one endpoint, dial all of them at once,
//! keep the first connection that opens and close the rest. This is Happy
//! Eyeballs (RFC 8305) without the staggered start: all candidates begin
//! together and none is preferred.
//!
//! # Outcomes
//!
//! A race ends in exactly one of four ways (see [`RaceOutcome`]):
//! - `Connected`: the first successful attempt, in completion order
//! - `Exhausted`: every attempt failed (or there were no candidates)
//! - `TimedOut`: the deadline passed before anything connected
//! - `Cancelled`: the caller's token fired before anything connected
//!
//! `Exhausted` and `TimedOut` both mean "nobody answered"; `Cancelled`
//! means "the caller gave up". [`RaceOutcome::into_result`] folds them into
//! `Ok(None)` and `Err(NetError::Aborted)` respectively.

use crate::base::neterror::NetError;
use crate::socket::connectjob::{AttemptOutcome, ConnectJob};
use crate::socket::reaper::{self, AttemptSet, ReapStats, StragglerPolicy, WinnerGate};
use crate::socket::scope::{saturating_millis, RaceScope};
use crate::socket::stream::Connector;
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Configuration for race behavior.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Overall deadline for one race in milliseconds (default: 5000)
    pub timeout_ms: u64,
    /// What happens to late connections after the result is known (default: detach)
    pub straggler_policy: StragglerPolicy,
    /// Upper bound on straggler cleanup in milliseconds (default: 2000)
    pub straggler_grace_ms: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            straggler_policy: StragglerPolicy::Detach,
            straggler_grace_ms: 2000,
        }
    }
}

impl RaceConfig {
    /// Short deadline for LAN peers and local services.
    pub fn local_network() -> Self {
        Self {
            timeout_ms: 1000,
            straggler_grace_ms: 500,
            ..Default::default()
        }
    }

    /// Close every straggler before the race returns.
    pub fn strict_cleanup() -> Self {
        Self {
            straggler_policy: StragglerPolicy::Await,
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn straggler_grace(&self) -> Duration {
        Duration::from_millis(self.straggler_grace_ms)
    }

    /// Reject settings the racer cannot honor.
    pub fn validate(&self) -> Result<(), NetError> {
        if self.timeout_ms == 0 {
            return Err(NetError::InvalidConfig("timeout_ms must be greater than zero".into()));
        }
        if self.straggler_grace_ms == 0 {
            return Err(NetError::InvalidConfig(
                "straggler_grace_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| NetError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// The connection that won a race.
pub struct Winner<S> {
    socket: S,
    addr: SocketAddr,
    elapsed: Duration,
}

impl<S> Winner<S> {
    /// Address of the candidate that connected.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Time from race start to the winning connection.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Take ownership of the connection.
    pub fn into_socket(self) -> S {
        self.socket
    }
}

impl<S> fmt::Debug for Winner<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Winner")
            .field("addr", &self.addr)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

/// How a race ended.
pub enum RaceOutcome<S> {
    Connected(Winner<S>),
    Exhausted,
    TimedOut,
    Cancelled,
}

impl<S> RaceOutcome<S> {
    pub fn is_connected(&self) -> bool {
        matches!(self, RaceOutcome::Connected(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RaceOutcome::Cancelled)
    }

    /// The winner, if any. Cancellation is discarded.
    pub fn winner(self) -> Option<Winner<S>> {
        match self {
            RaceOutcome::Connected(w) => Some(w),
            _ => None,
        }
    }

    /// Fold into "connection, none, or cancelled".
    pub fn into_result(self) -> Result<Option<Winner<S>>, NetError> {
        match self {
            RaceOutcome::Connected(w) => Ok(Some(w)),
            RaceOutcome::Exhausted | RaceOutcome::TimedOut => Ok(None),
            RaceOutcome::Cancelled => Err(NetError::Aborted),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RaceOutcome::Connected(_) => "connected",
            RaceOutcome::Exhausted => "exhausted",
            RaceOutcome::TimedOut => "timed_out",
            RaceOutcome::Cancelled => "cancelled",
        }
    }
}

impl<S> fmt::Debug for RaceOutcome<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceOutcome::Connected(w) => f.debug_tuple("Connected").field(w).finish(),
            RaceOutcome::Exhausted => f.write_str("Exhausted"),
            RaceOutcome::TimedOut => f.write_str("TimedOut"),
            RaceOutcome::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Why the race stopped waiting without a winner.
enum Interrupt {
    External,
    Deadline,
}

/// Races connection attempts across candidate addresses.
pub struct ConnectRacer<C: Connector> {
    connector: Arc<C>,
    policy: StragglerPolicy,
    grace: Duration,
}

impl<C: Connector> Clone for ConnectRacer<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            policy: self.policy,
            grace: self.grace,
        }
    }
}

impl<C: Connector> fmt::Debug for ConnectRacer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRacer")
            .field("policy", &self.policy)
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> ConnectRacer<C> {
    pub fn new(connector: C) -> Self {
        Self::from_arc(Arc::new(connector))
    }

    /// Share an existing connector.
    pub fn from_arc(connector: Arc<C>) -> Self {
        let defaults = RaceConfig::default();
        Self {
            connector,
            policy: defaults.straggler_policy,
            grace: defaults.straggler_grace(),
        }
    }

    /// Apply the straggler settings of `config`. The timeout is per call.
    pub fn with_config(mut self, config: &RaceConfig) -> Self {
        self.policy = config.straggler_policy;
        self.grace = config.straggler_grace();
        self
    }

    pub fn straggler_policy(mut self, policy: StragglerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn straggler_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn connector(&self) -> &Arc<C> {
        &self.connector
    }

    /// Race a connection to every address on `port`.
    ///
    /// Duplicate addresses are dialed once. The first attempt to connect wins
    /// regardless of its position; every other connection that opens is
    /// closed according to the straggler policy.
    pub async fn race<I>(
        &self,
        addresses: I,
        port: u16,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> RaceOutcome<C::Socket>
    where
        I: IntoIterator<Item = IpAddr>,
    {
        let candidates = candidates(addresses, port);
        if candidates.is_empty() {
            tracing::debug!(port, "no candidate addresses, nothing to race");
            return RaceOutcome::Exhausted;
        }
        if cancel.is_cancelled() {
            tracing::debug!(port, "race cancelled before start");
            return RaceOutcome::Cancelled;
        }

        let start = Instant::now();
        let scope = RaceScope::new(cancel, timeout);
        let gate = Arc::new(WinnerGate::new());

        tracing::debug!(
            candidates = candidates.len(),
            port,
            timeout_ms = saturating_millis(timeout),
            "connection race started"
        );

        let mut pending: AttemptSet<C::Socket> = JoinSet::new();
        for addr in candidates {
            let connector = Arc::clone(&self.connector);
            let scope = scope.clone();
            let gate = Arc::clone(&gate);
            pending.spawn(async move {
                let outcome = match ConnectJob::new(addr).run(&*connector, &scope).await {
                    // Someone else already won: this handle never leaves the task
                    AttemptOutcome::Succeeded(socket) if !gate.try_claim() => {
                        reaper::close_straggler(&*connector, addr, socket).await;
                        AttemptOutcome::Discarded
                    }
                    other => other,
                };
                (addr, outcome)
            });
        }

        let mut failures = 0usize;
        let outcome = loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(Interrupt::External),
                _ = tokio::time::sleep_until(scope.deadline()) => break Err(Interrupt::Deadline),
                joined = pending.join_next() => joined,
            };

            match joined {
                None => break Ok(None),
                Some(Ok((addr, AttemptOutcome::Succeeded(socket)))) => {
                    break Ok(Some(Winner {
                        socket,
                        addr,
                        elapsed: start.elapsed(),
                    }));
                }
                Some(Ok((_, AttemptOutcome::Failed(_)))) => failures += 1,
                Some(Ok((_, AttemptOutcome::Cancelled | AttemptOutcome::Discarded))) => {}
                Some(Err(e)) => {
                    tracing::error!(error = %e, "connect attempt task failed");
                    failures += 1;
                }
            }
        };

        // Decided one way or another: no later success may become a winner
        gate.seal();
        scope.cancel();

        let outcome = match outcome {
            Ok(Some(winner)) => RaceOutcome::Connected(winner),
            Ok(None) => RaceOutcome::Exhausted,
            Err(Interrupt::External) => RaceOutcome::Cancelled,
            Err(Interrupt::Deadline) => RaceOutcome::TimedOut,
        };

        match &outcome {
            RaceOutcome::Connected(w) => tracing::debug!(
                winner = %w.addr,
                elapsed_ms = saturating_millis(w.elapsed),
                failures,
                outstanding = pending.len(),
                "connection race won"
            ),
            other => tracing::debug!(
                outcome = other.kind(),
                elapsed_ms = saturating_millis(start.elapsed()),
                failures,
                outstanding = pending.len(),
                "connection race ended without a winner"
            ),
        }

        self.reap(pending).await;
        outcome
    }

    /// Hand the unfinished attempts to the cleanup policy.
    async fn reap(&self, pending: AttemptSet<C::Socket>) {
        if pending.is_empty() {
            return;
        }
        match self.policy {
            StragglerPolicy::Await => {
                reaper::drain(&*self.connector, pending, self.grace).await;
            }
            StragglerPolicy::Detach => {
                let connector = Arc::clone(&self.connector);
                let grace = self.grace;
                tokio::spawn(async move {
                    let _stats: ReapStats = reaper::drain(&*connector, pending, grace).await;
                });
            }
        }
    }
}

/// Pair each distinct address with `port`, keeping first-seen order.
fn candidates<I>(addresses: I, port: u16) -> Vec<SocketAddr>
where
    I: IntoIterator<Item = IpAddr>,
{
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|ip| seen.insert(*ip))
        .map(|ip| SocketAddr::new(ip, port))
        .collect()
}
