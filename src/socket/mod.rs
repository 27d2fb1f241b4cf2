//! Socket and connection establishment.
//!
//! Provides connection racing mirroring Chromium's `net/socket/` connect jobs:
//! - [`stream`]: `Connector` transport seam and the TCP implementation
//! - [`scope`]: shared cancellation + deadline of one race
//! - [`connectjob`]: a single connection attempt
//! - [`racer`]: first-success-wins racing across candidate addresses
//! - [`reaper`]: closing connections that lose the race

pub mod connectjob;
pub mod racer;
pub mod reaper;
pub mod scope;
pub mod stream;

pub use connectjob::{AttemptOutcome, ConnectJob};
pub use racer::{ConnectRacer, RaceConfig, RaceOutcome, Winner};
pub use reaper::{ReapStats, StragglerPolicy, WinnerGate};
pub use scope::RaceScope;
pub use stream::{Closing, Connecting, Connector, TcpConnector};
