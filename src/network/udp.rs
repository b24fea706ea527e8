//! UDP socket setup

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use crate::constants::MAX_PACKET_SIZE;
use crate::error::NetworkError;
use crate::network::DatagramSink;

/// Create an unconnected UDP socket bound to `bind_ip` on an ephemeral port.
///
/// If `bind_ip` is of a different family than `dest`, the unspecified
/// address of `dest`'s family is used instead.
pub fn create_socket(bind_ip: IpAddr, dest: SocketAddr) -> Result<UdpSocket, NetworkError> {
    let bind_ip = match (bind_ip, dest) {
        (IpAddr::V4(_), SocketAddr::V4(_)) | (IpAddr::V6(_), SocketAddr::V6(_)) => bind_ip,
        (_, SocketAddr::V4(_)) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        (_, SocketAddr::V6(_)) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    let bind_addr = SocketAddr::new(bind_ip, 0);

    let socket = Socket::new(Domain::for_address(dest), Type::DGRAM, Some(Protocol::UDP))
        .map_err(NetworkError::SocketFailed)?;

    // A few packets of headroom; PCMU at 50 pps never needs more
    socket
        .set_send_buffer_size(MAX_PACKET_SIZE * 32)
        .map_err(NetworkError::SocketFailed)?;

    socket
        .bind(&bind_addr.into())
        .map_err(|source| NetworkError::BindFailed { addr: bind_addr, source })?;

    Ok(socket.into())
}

/// One-way datagram channel to a fixed peer
pub struct UdpChannel {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpChannel {
    pub fn open(bind_ip: IpAddr, dest: SocketAddr) -> Result<Self, NetworkError> {
        let socket = create_socket(bind_ip, dest)?;
        tracing::debug!(
            "UDP channel {} -> {}",
            socket.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            dest
        );
        Ok(Self { socket, dest })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramSink for UdpChannel {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        let sent = self.socket.send_to(datagram, self.dest)?;
        if sent != datagram.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {sent} of {} bytes", datagram.len()),
            ));
        }
        Ok(())
    }

    fn peer(&self) -> SocketAddr {
        self.dest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_channel_delivers_to_peer() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let dest = receiver.local_addr().unwrap();

        let mut channel = UdpChannel::open(IpAddr::V4(Ipv4Addr::UNSPECIFIED), dest).unwrap();
        channel.send(&[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[1, 2, 3, 4]);
        assert_eq!(from.port(), channel.local_addr().unwrap().port());
        assert_eq!(channel.peer(), dest);
    }

    #[test]
    fn test_family_mismatch_falls_back() {
        let socket = create_socket(
            IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            "127.0.0.1:5004".parse().unwrap(),
        )
        .unwrap();
        assert!(socket.local_addr().unwrap().is_ipv4());
    }
}
