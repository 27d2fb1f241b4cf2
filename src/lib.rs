//! # netrace
//!
//! Concurrent multi-address connection establishment for Rust.
//!
//! `netrace` takes every resolved address of one logical endpoint, dials all
//! of them at once, keeps the first connection that opens and closes the
//! rest. It is Happy Eyeballs generalized to N simultaneous candidates, with
//! a shared deadline, caller cancellation, and leak-free cleanup of
//! connections that lose the race.
//!
//! ## Features
//!
//! - **First success wins**: completion order decides, not list order
//! - **One scope per race**: deadline + caller token fan out to every attempt
//! - **No leaked sockets**: late winners are closed exactly once
//! - **Distinct outcomes**: connected, exhausted, timed out, or cancelled
//! - **Pluggable transport**: race over anything implementing [`Connector`](socket::Connector)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use netrace::Client;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::new();
//!     let addrs = netrace::interfaces::local_ipv4_addrs().unwrap();
//!     let outcome = client.connect(addrs, 11338, &CancellationToken::new()).await;
//!     match outcome.into_result() {
//!         Ok(Some(winner)) => println!("Connected to {}", winner.addr()),
//!         Ok(None) => println!("Nobody answered"),
//!         Err(e) => println!("Gave up: {}", e),
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Core types and error definitions
//! - [`socket`] - Connectors, connect jobs, racing and straggler cleanup
//! - [`client`] - Configured high-level entry point
//! - [`endpoint`] - URL decomposition into host and port
//! - [`interfaces`] - Local IPv4 address discovery
//! - [`merge`] - Order-preserving list merge

pub mod base;
pub mod client;
pub mod endpoint;
pub mod interfaces;
pub mod merge;
pub mod socket;

pub use base::neterror::NetError;
pub use client::{Client, ClientBuilder};
pub use endpoint::{parse_url, Endpoint};
pub use socket::{ConnectRacer, Connector, RaceConfig, RaceOutcome, StragglerPolicy, Winner};
