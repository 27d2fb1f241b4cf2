//! Local interface address discovery.
//!
//! Lists the IPv4 addresses this host can be reached on, typically handed to
//! a peer so it can race connections back to every one of them.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use std::net::IpAddr;

/// Non-loopback IPv4 addresses of every local interface, in OS order.
pub fn local_ipv4_addrs() -> Result<Vec<IpAddr>, NetError> {
    let interfaces = if_addrs::get_if_addrs().interface_context()?;
    let addrs = usable_ipv4(interfaces.iter().map(|iface| iface.ip()));
    tracing::debug!(count = addrs.len(), "enumerated local IPv4 addresses");
    Ok(addrs)
}

/// Keep IPv4 addresses that are not loopback.
pub fn usable_ipv4<I>(addrs: I) -> Vec<IpAddr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs
        .into_iter()
        .filter(|ip| ip.is_ipv4() && !ip.is_loopback())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_usable_ipv4_filters() {
        let addrs = usable_ipv4(vec![
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V6("fe80::1".parse().unwrap()),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
            IpAddr::V4(Ipv4Addr::new(127, 0, 1, 1)),
        ]);

        assert_eq!(
            addrs,
            vec![
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
            ]
        );
    }

    #[test]
    fn test_local_ipv4_addrs_never_loopback() {
        // Hosts without network interfaces still succeed with an empty list
        if let Ok(addrs) = local_ipv4_addrs() {
            assert!(addrs.iter().all(|ip| ip.is_ipv4() && !ip.is_loopback()));
        }
    }
}
