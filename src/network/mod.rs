//! Network subsystem for UDP RTP/RTCP transport

pub mod sender;
pub mod udp;

use std::io;
use std::net::SocketAddr;

pub use sender::{ChannelSender, Delivery, FailureAction, SendPolicy, SenderStats};
pub use udp::{create_socket, UdpChannel};

/// Unreliable, connectionless delivery to one fixed peer
pub trait DatagramSink {
    /// Hand one whole datagram to the transport
    fn send(&mut self, datagram: &[u8]) -> io::Result<()>;

    /// Where datagrams go
    fn peer(&self) -> SocketAddr;
}
