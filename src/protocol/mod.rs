//! Wire formats
//!
//! RTP media packets carrying PCMU and the RTCP Sender Report that
//! accompanies them on the adjacent port.

pub mod rtcp;
pub mod rtp;

pub use rtcp::{NtpTimestamp, SenderReport, SENDER_REPORT_LEN};
pub use rtp::{RtpHeader, RtpPacket, RTP_HEADER_LEN};

/// RTP/RTCP protocol version
pub const RTP_VERSION: u8 = 2;
