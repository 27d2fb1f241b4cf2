use crate::base::neterror::NetError;
use crate::socket::scope::{saturating_millis, RaceScope};
use crate::socket::stream::Connector;
use std::fmt;
use std::net::SocketAddr;
use tokio::time::Instant;

/// Result of one connection attempt. Produced exactly once per candidate.
pub enum AttemptOutcome<S> {
    /// The connection is open; the handle now belongs to whoever ran the job.
    Succeeded(S),
    /// The transport reported an error. Expected, not a fault of the race.
    Failed(NetError),
    /// The scope was cancelled before the connect finished. Nothing is held.
    Cancelled,
    /// Connected after another attempt had already won; the handle was closed.
    Discarded,
}

impl<S> AttemptOutcome<S> {
    /// Short label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptOutcome::Succeeded(_) => "succeeded",
            AttemptOutcome::Failed(_) => "failed",
            AttemptOutcome::Cancelled => "cancelled",
            AttemptOutcome::Discarded => "discarded",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded(_))
    }
}

impl<S> fmt::Debug for AttemptOutcome<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Succeeded(_) => f.write_str("Succeeded(..)"),
            AttemptOutcome::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            AttemptOutcome::Cancelled => f.write_str("Cancelled"),
            AttemptOutcome::Discarded => f.write_str("Discarded"),
        }
    }
}

/// Connects to a single candidate address.
/// Roughly equivalent to net::TransportConnectJob for one endpoint.
pub struct ConnectJob {
    addr: SocketAddr,
}

impl ConnectJob {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the attempt under `scope`.
    ///
    /// Cancellation is checked before dialing and raced against the connect
    /// itself. When the connect and the cancellation are ready together the
    /// connect wins, so a freshly opened handle is always handed back and
    /// never dropped inside the job.
    pub async fn run<C>(self, connector: &C, scope: &RaceScope) -> AttemptOutcome<C::Socket>
    where
        C: Connector + ?Sized,
    {
        let addr = self.addr;
        let start = Instant::now();

        if scope.is_cancelled() {
            tracing::debug!(peer = %addr, "attempt skipped, scope already cancelled");
            return AttemptOutcome::Cancelled;
        }

        tracing::debug!(peer = %addr, "connect attempt started");

        let outcome = tokio::select! {
            biased;
            result = connector.connect(addr) => match result {
                Ok(socket) => AttemptOutcome::Succeeded(socket),
                Err(e) => AttemptOutcome::Failed(e),
            },
            _ = scope.cancelled() => AttemptOutcome::Cancelled,
        };

        let elapsed_ms = saturating_millis(start.elapsed());
        match &outcome {
            AttemptOutcome::Failed(e) => tracing::debug!(
                peer = %addr,
                elapsed_ms,
                outcome = outcome.kind(),
                error = %e,
                "connect attempt finished"
            ),
            _ => tracing::debug!(
                peer = %addr,
                elapsed_ms,
                outcome = outcome.kind(),
                "connect attempt finished"
            ),
        }

        outcome
    }
}
