//! Connection Race Tests
//!
//! Covers:
//! - Real TCP: reachable address wins wherever it sits in the list
//! - Real TCP: losing connections are closed (peer reads EOF)
//! - Every address refused ends exhausted, not cancelled
//! - Fake transport: opens == closes + 1 with many simultaneous successes
//! - Deadline vs caller cancellation map to different results
//! - One client shared by concurrent races

use futures::future::join_all;
use netrace::socket::{Closing, Connecting, Connector, StragglerPolicy};
use netrace::{Client, ConnectRacer, NetError, RaceConfig, RaceOutcome};
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn loopback(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, last))
}

/// Bind a port on 127.0.0.1 that nothing else on 127.0.0.x listens on.
async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[tokio::test]
async fn test_reachable_address_wins_at_any_position() {
    init_tracing();
    let (listener, port) = listener().await;
    let accept = tokio::spawn(async move {
        for _ in 0..3 {
            let _ = listener.accept().await;
        }
    });

    let client = Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let orders = [
        vec![loopback(1), loopback(2), loopback(3)],
        vec![loopback(2), loopback(1), loopback(3)],
        vec![loopback(2), loopback(3), loopback(1)],
    ];
    for order in orders {
        let outcome = client
            .connect(order.clone(), port, &CancellationToken::new())
            .await;
        let winner = outcome.winner().expect("reachable address should win");
        assert_eq!(winner.addr(), SocketAddr::new(loopback(1), port), "order {:?}", order);
    }

    accept.abort();
}

#[tokio::test]
async fn test_all_refused_is_exhausted() {
    init_tracing();
    let (listener, port) = listener().await;
    // Free the port so every dial is refused
    drop(listener);

    let client = Client::new();
    let outcome = client
        .connect(vec![loopback(1)], port, &CancellationToken::new())
        .await;

    assert!(matches!(outcome, RaceOutcome::Exhausted));
    assert!(outcome.into_result().unwrap().is_none());
}

#[tokio::test]
async fn test_loser_connection_is_closed() {
    init_tracing();
    let (first, port) = listener().await;
    let second = match TcpListener::bind(SocketAddr::new(loopback(2), port)).await {
        Ok(l) => l,
        // 127.0.0.2 is not routable on every host
        Err(_) => return,
    };

    let client = Client::builder()
        .straggler_policy(StragglerPolicy::Await)
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let outcome = client
        .connect(vec![loopback(1), loopback(2)], port, &CancellationToken::new())
        .await;
    let winner = outcome.winner().expect("one listener should win");

    let loser = if winner.addr().ip() == loopback(1) {
        second
    } else {
        first
    };

    // A loser that never finished its handshake leaves nothing to accept
    if let Ok(Ok((mut stream, _))) = timeout(Duration::from_millis(500), loser.accept()).await {
        let mut buf = [0u8; 16];
        match timeout(Duration::from_secs(1), stream.read(&mut buf)).await {
            Ok(Ok(n)) => assert_eq!(n, 0, "loser should see EOF"),
            Ok(Err(_)) => {} // reset also counts as closed
            Err(_) => panic!("losing connection was left open"),
        }
    }
}

/// Fake transport: each address connects after a fixed delay or hangs.
struct Scripted {
    delays: HashMap<IpAddr, Option<u64>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl Scripted {
    fn with(delays: &[(u8, Option<u64>)]) -> Self {
        Self {
            delays: delays.iter().map(|(ip, d)| (loopback(*ip), *d)).collect(),
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Connector for Scripted {
    type Socket = SocketAddr;

    fn connect(&self, addr: SocketAddr) -> Connecting<SocketAddr> {
        let delay = self.delays.get(&addr.ip()).copied().flatten();
        let opened = Arc::clone(&self.opened);
        Box::pin(async move {
            match delay {
                Some(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    opened.fetch_add(1, Ordering::SeqCst);
                    Ok(addr)
                }
                None => std::future::pending().await,
            }
        })
    }

    fn close(&self, _socket: SocketAddr) -> Closing {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok::<(), io::Error>(()) })
    }
}

fn awaiting(connector: Scripted) -> ConnectRacer<Scripted> {
    ConnectRacer::new(connector).with_config(&RaceConfig::strict_cleanup())
}

#[tokio::test(start_paused = true)]
async fn test_every_extra_success_is_closed() {
    let delays: Vec<(u8, Option<u64>)> = (1..=8).map(|i| (i, Some(10))).collect();
    let connector = Scripted::with(&delays);
    let (opened, closed) = (Arc::clone(&connector.opened), Arc::clone(&connector.closed));
    let racer = awaiting(connector);

    let outcome = racer
        .race(
            (1..=8).map(loopback),
            9000,
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_connected());
    assert_eq!(
        opened.load(Ordering::SeqCst),
        closed.load(Ordering::SeqCst) + 1
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_winner_beats_hanging_peers() {
    let connector = Scripted::with(&[(1, None), (2, Some(40)), (3, None)]);
    let (opened, closed) = (Arc::clone(&connector.opened), Arc::clone(&connector.closed));
    let racer = awaiting(connector);

    let outcome = racer
        .race(
            vec![loopback(1), loopback(2), loopback(3)],
            9000,
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await;

    let winner = outcome.winner().unwrap();
    assert_eq!(winner.addr(), SocketAddr::new(loopback(2), 9000));
    assert_eq!(*winner.socket(), SocketAddr::new(loopback(2), 9000));
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(closed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_is_not_an_error() {
    let racer = awaiting(Scripted::with(&[(1, None), (2, None)]));

    let outcome = racer
        .race(
            vec![loopback(1), loopback(2)],
            9000,
            Duration::from_millis(250),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(outcome, RaceOutcome::TimedOut));
    assert!(outcome.into_result().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_caller_cancel_is_an_error() {
    let racer = awaiting(Scripted::with(&[(1, None), (2, None)]));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = racer
        .race(
            vec![loopback(1), loopback(2)],
            9000,
            Duration::from_secs(5),
            &cancel,
        )
        .await;

    assert!(outcome.is_cancelled());
    assert_eq!(outcome.into_result().unwrap_err(), NetError::Aborted);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_races_share_one_client() {
    let connector = Scripted::with(&[(1, Some(5)), (2, Some(15)), (3, Some(25))]);
    let (opened, closed) = (Arc::clone(&connector.opened), Arc::clone(&connector.closed));
    let client = Client::with_connector(connector, RaceConfig::strict_cleanup());
    let cancel = CancellationToken::new();

    let races = (0..4).map(|_| {
        client.connect(vec![loopback(3), loopback(2), loopback(1)], 9000, &cancel)
    });
    let outcomes = join_all(races).await;

    for outcome in outcomes {
        assert_eq!(outcome.winner().unwrap().addr().ip(), loopback(1));
    }
    // Slower peers are cancelled mid-dial, never opened
    assert_eq!(opened.load(Ordering::SeqCst), 4);
    assert_eq!(closed.load(Ordering::SeqCst), 0);
}
