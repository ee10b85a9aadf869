//! Address resolution and socket construction

use crate::error::{Result, TransportError};
use disco_core::TransportConfig;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

/// Resolves a `host:port` string to the first matching socket address.
pub async fn resolve(addr: &str) -> Result<SocketAddr> {
    let mut addrs = tokio::net::lookup_host(addr)
        .await
        .map_err(|e| TransportError::AddressResolution {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

    addrs.next().ok_or_else(|| TransportError::AddressResolution {
        addr: addr.to_string(),
        reason: "no addresses found".to_string(),
    })
}

/// Creates a transient socket for sending to `target`.
pub(crate) fn sender_socket(target: &SocketAddr, config: &TransportConfig) -> Result<UdpSocket> {
    build_sender(target, config)
        .and_then(UdpSocket::from_std)
        .map_err(|e| TransportError::socket(target, e))
}

fn build_sender(target: &SocketAddr, config: &TransportConfig) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(
        Domain::for_address(*target),
        Type::DGRAM,
        Some(Protocol::UDP),
    )?;

    let local: SocketAddr = match target.ip() {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    if target.ip().is_multicast() {
        match target.ip() {
            IpAddr::V4(_) => {
                socket.set_multicast_ttl_v4(config.multicast_ttl)?;
                socket.set_multicast_loop_v4(config.multicast_loop)?;
                if let Some(interface) = config.interface_v4 {
                    socket.set_multicast_if_v4(&interface)?;
                }
            }
            IpAddr::V6(_) => {
                socket.set_multicast_hops_v6(config.multicast_ttl)?;
                socket.set_multicast_loop_v6(config.multicast_loop)?;
                if config.interface_v6 != 0 {
                    socket.set_multicast_if_v6(config.interface_v6)?;
                }
            }
        }
    }

    socket.set_nonblocking(true)?;
    socket.bind(&local.into())?;

    Ok(socket.into())
}

/// Creates a socket bound to the group's port and joined to the group.
#[instrument(skip(config))]
pub(crate) fn group_socket(group: &SocketAddr, config: &TransportConfig) -> Result<UdpSocket> {
    let socket = build_group(group, config)
        .and_then(UdpSocket::from_std)
        .map_err(|e| TransportError::socket(group, e))?;

    debug!(%group, "Joined multicast group");
    Ok(socket)
}

fn build_group(group: &SocketAddr, config: &TransportConfig) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::for_address(*group), Type::DGRAM, Some(Protocol::UDP))?;

    // Every subscriber binds the same port
    socket.set_reuse_address(true)?;
    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    socket.set_reuse_port(true)?;

    if let Some(size) = config.recv_buffer_size {
        // Best-effort, the OS may clamp it
        let _ = socket.set_recv_buffer_size(size);
    }

    match group.ip() {
        IpAddr::V4(ip) => {
            socket.join_multicast_v4(&ip, &config.interface_v4())?;
            socket.set_multicast_loop_v4(config.multicast_loop)?;
        }
        IpAddr::V6(ip) => {
            socket.set_only_v6(true)?;
            socket.join_multicast_v6(&ip, config.interface_v6)?;
            socket.set_multicast_loop_v6(config.multicast_loop)?;
        }
    }

    socket.set_nonblocking(true)?;
    socket.bind(&bind_addr(group).into())?;

    Ok(socket.into())
}

/// Unix stacks accept a bind to the group itself, which filters out
/// traffic for other groups sharing the port.
#[cfg(unix)]
fn bind_addr(group: &SocketAddr) -> SocketAddr {
    *group
}

#[cfg(not(unix))]
fn bind_addr(group: &SocketAddr) -> SocketAddr {
    match group.ip() {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, group.port()).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, group.port()).into(),
    }
}
