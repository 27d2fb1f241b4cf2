//! Endpoint and Helper Tests
//!
//! Covers:
//! - URL to endpoint decomposition feeding a race
//! - Local interface discovery
//! - Order-preserving merge of address lists

use netrace::interfaces::{local_ipv4_addrs, usable_ipv4};
use netrace::merge::smart_merge;
use netrace::{parse_url, Client, NetError};
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[test]
fn test_parse_url_for_pairing_address() {
    let ep = parse_url("http://192.168.1.20:11338/pair?code=abc").unwrap();
    assert_eq!(ep.host, "192.168.1.20");
    assert_eq!(ep.port, 11338);
    assert_eq!(ep.host_and_port, "192.168.1.20:11338");
    assert_eq!(ep.path, "/pair?code=abc");
}

#[test]
fn test_parse_url_errors_carry_codes() {
    let err = parse_url("gopher://example.com").unwrap_err();
    assert_eq!(err, NetError::UnknownUrlScheme);
    assert_eq!(err.as_i32(), -302);

    let err = parse_url("http://").unwrap_err();
    assert_eq!(err.as_i32(), -300);
}

#[tokio::test]
async fn test_connect_url_uses_url_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    let client = Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let url = format!("http://device.local:{}/", port);
    let addrs: Vec<IpAddr> = vec!["127.0.0.1".parse().unwrap()];

    let outcome = client
        .connect_url(&url, addrs, &CancellationToken::new())
        .await
        .unwrap();

    let winner = outcome.winner().expect("listener should accept");
    assert_eq!(winner.addr().port(), port);
}

#[test]
fn test_local_addresses_are_raceable() {
    let Ok(addrs) = local_ipv4_addrs() else {
        return;
    };
    // Already filtered; filtering again changes nothing
    assert_eq!(usable_ipv4(addrs.clone()), addrs);
}

#[test]
fn test_merge_new_addresses_into_known_order() {
    let known: Vec<IpAddr> = vec!["10.0.0.5".parse().unwrap(), "192.168.1.20".parse().unwrap()];
    let fresh: Vec<IpAddr> = vec![
        "10.0.0.5".parse().unwrap(),
        "172.16.0.9".parse().unwrap(),
        "192.168.1.20".parse().unwrap(),
    ];

    let merged = smart_merge(&known, &fresh);
    assert_eq!(
        merged,
        vec![
            "10.0.0.5".parse::<IpAddr>().unwrap(),
            "172.16.0.9".parse().unwrap(),
            "192.168.1.20".parse().unwrap(),
        ]
    );
}
