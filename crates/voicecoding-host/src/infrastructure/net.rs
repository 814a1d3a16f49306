//! Local network helpers for showing the user where to point the phone.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Returns this machine's LAN address.
///
/// "Connecting" a UDP socket sends no packets; it only asks the OS which
/// local interface would route to the given address.  Falls back to
/// `127.0.0.1` when there is no route (e.g. offline).
pub fn local_ip() -> IpAddr {
    probe_route().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn probe_route() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
    Ok(socket.local_addr()?.ip())
}

/// The `ws://` URL a phone should use to reach a listener bound to `bind`.
///
/// A wildcard bind address is replaced with the LAN address.
pub fn phone_url(bind: SocketAddr) -> String {
    let ip = if bind.ip().is_unspecified() {
        local_ip()
    } else {
        bind.ip()
    };
    format!("ws://{}", SocketAddr::new(ip, bind.port()))
}
