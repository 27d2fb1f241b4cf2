//! Straggler cleanup for decided races.
//!
//! Launching N attempts to keep one means up to N-1 connections may open
//! after the race is over. Everything here exists so those handles are closed
//! exactly once instead of leaking:
//! - [`WinnerGate`]: single-assignment slot deciding the race
//! - [`close_straggler`]: closes one late handle, logging failures
//! - [`drain`]: joins every outstanding attempt and closes what succeeded

use crate::socket::connectjob::AttemptOutcome;
use crate::socket::scope::saturating_millis;
use crate::socket::stream::Connector;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;

/// Pending attempts of a race, keyed by the address they dial.
pub type AttemptSet<S> = JoinSet<(SocketAddr, AttemptOutcome<S>)>;

/// Atomic single-assignment gate for the race decision.
///
/// Every attempt that connects calls `try_claim` from its own task. The first
/// call returns true and that attempt may hand its handle to the racer; every
/// later call returns false and the handle goes straight to cleanup. The
/// racer seals the gate once it stops waiting, so nothing can win afterwards.
#[derive(Debug, Default)]
pub struct WinnerGate {
    decided: AtomicBool,
}

impl WinnerGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the decision. Returns true for exactly one caller.
    pub fn try_claim(&self) -> bool {
        self.decided
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Decide without a winner. Every later `try_claim` fails.
    pub fn seal(&self) {
        self.decided.store(true, Ordering::Release);
    }

    pub fn is_decided(&self) -> bool {
        self.decided.load(Ordering::Acquire)
    }
}

/// How stragglers are handled once the race has returned its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StragglerPolicy {
    /// Drain on a spawned task; the caller gets its result immediately.
    #[default]
    Detach,
    /// Drain before the race returns.
    Await,
}

/// Counters reported by a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReapStats {
    /// Late handles closed through the connector.
    pub closed: usize,
    /// Late handles whose close returned an error (still released).
    pub close_failures: usize,
    /// Attempts aborted because the grace period ran out.
    pub abandoned: usize,
}

impl ReapStats {
    fn record(&mut self, closed_cleanly: bool) {
        if closed_cleanly {
            self.closed += 1;
        } else {
            self.close_failures += 1;
        }
    }
}

/// Close one handle that lost the race.
///
/// Returns true if the connector closed it cleanly. Failures are logged and
/// swallowed; the handle is released either way.
pub async fn close_straggler<C>(connector: &C, addr: SocketAddr, socket: C::Socket) -> bool
where
    C: Connector + ?Sized,
{
    match connector.close(socket).await {
        Ok(()) => {
            tracing::debug!(peer = %addr, "closed straggler connection");
            true
        }
        Err(e) => {
            tracing::warn!(peer = %addr, error = %e, "failed to close straggler connection");
            false
        }
    }
}

/// Join every outstanding attempt and close each late success.
///
/// The scope of `pending` must already be cancelled, so attempts unwind
/// promptly. If they have not all finished within `grace` the rest are
/// aborted; an aborted task never hands its handle to us, and the handle is
/// released by `Drop` instead. Attempts that finished before the abort landed
/// are still closed through the connector, each bounded by `grace`.
pub async fn drain<C>(connector: &C, mut pending: AttemptSet<C::Socket>, grace: Duration) -> ReapStats
where
    C: Connector + ?Sized,
{
    let mut stats = ReapStats::default();

    let collected = tokio::time::timeout(grace, async {
        while let Some(joined) = pending.join_next().await {
            reap_one(connector, joined, &mut stats).await;
        }
    })
    .await;

    if collected.is_err() {
        tracing::warn!(
            remaining = pending.len(),
            grace_ms = saturating_millis(grace),
            "straggler drain exceeded grace period, aborting remaining attempts"
        );
        pending.abort_all();
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((addr, AttemptOutcome::Succeeded(socket))) => {
                    let close = close_straggler(connector, addr, socket);
                    match tokio::time::timeout(grace, close).await {
                        Ok(clean) => stats.record(clean),
                        Err(_) => {
                            tracing::warn!(peer = %addr, "straggler close timed out, dropping handle");
                            stats.abandoned += 1;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) if e.is_cancelled() => stats.abandoned += 1,
                Err(e) => tracing::error!(error = %e, "connect attempt task failed"),
            }
        }
    }

    if stats != ReapStats::default() {
        tracing::debug!(
            closed = stats.closed,
            close_failures = stats.close_failures,
            abandoned = stats.abandoned,
            "straggler drain complete"
        );
    }
    stats
}

async fn reap_one<C>(
    connector: &C,
    joined: Result<(SocketAddr, AttemptOutcome<C::Socket>), tokio::task::JoinError>,
    stats: &mut ReapStats,
) where
    C: Connector + ?Sized,
{
    match joined {
        Ok((addr, AttemptOutcome::Succeeded(socket))) => {
            let clean = close_straggler(connector, addr, socket).await;
            stats.record(clean);
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "connect attempt task failed"),
    }
}
