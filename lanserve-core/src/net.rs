//! Network address discovery
//!
//! Best-effort resolution of the addresses the host answers on, for banner
//! display only.

use std::io;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs, UdpSocket};

/// Addresses the host is reachable on
#[derive(Debug, Clone)]
pub struct HostAddresses {
    /// Address the machine's own hostname resolves to (loopback fallback)
    pub local: IpAddr,
    /// Additional LAN-reachable addresses
    pub lan: Vec<IpAddr>,
}

/// Discover the host's local and LAN-reachable addresses
///
/// Failures along the way are logged and swallowed; the result always
/// carries at least the loopback address. Never blocks startup on an
/// unreachable network.
pub fn discover() -> HostAddresses {
    let mut local = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let mut lan = Vec::new();

    match hostname_address() {
        Ok(addr) => local = addr,
        Err(e) => tracing::warn!("Error resolving hostname address: {}", e),
    }

    match outbound_address() {
        Ok(addr) => {
            if addr != local {
                lan.push(addr);
            }
        }
        Err(e) => tracing::warn!("Error probing outbound interface: {}", e),
    }

    HostAddresses { local, lan }
}

/// Resolve the machine hostname to an address
fn hostname_address() -> io::Result<IpAddr> {
    let name = hostname::get()?;
    let name = name.to_string_lossy();
    (name.as_ref(), 0u16)
        .to_socket_addrs()?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("hostname {} has no addresses", name),
            )
        })
}

/// Let the OS pick the outbound interface by aiming a connectionless
/// socket at a non-routable address (no datagram is sent)
fn outbound_address() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.connect(("10.255.255.255", 1))?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_never_fails() {
        // Must hold even on hosts with no reachable LAN interface
        let addresses = discover();
        assert!(!addresses.lan.contains(&addresses.local));
    }
}
