use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Stand-in deadline for timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Shared cancellation and deadline context of one race.
///
/// The token is a child of the caller's token: cancelling the caller's token
/// cancels the scope, cancelling the scope never touches the caller's token.
/// Every attempt of the race observes a clone of the same token.
#[derive(Debug, Clone)]
pub struct RaceScope {
    token: CancellationToken,
    deadline: Instant,
}

impl RaceScope {
    /// Derive a scope from the caller's signal and the race timeout.
    pub fn new(external: &CancellationToken, timeout: Duration) -> Self {
        Self {
            token: external.child_token(),
            deadline: deadline_after(timeout),
        }
    }

    /// Signal every attempt bound to this scope to give up. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled, for any reason.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// `now + timeout`, capped at roughly 30 years out.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
