//! RTP fixed header and packetization (RFC 3550 §5.1)
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       sequence number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                             SSRC                              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Fields are packed by explicit shifts into network byte order; the
//! in-memory layout of [`RtpHeader`] has no bearing on the wire.

use bytes::{BufMut, Bytes, BytesMut};

use super::RTP_VERSION;

/// Size of the fixed header with no CSRC list
pub const RTP_HEADER_LEN: usize = 12;

/// Static payload type for PCMU (RFC 3551)
pub const PAYLOAD_TYPE_PCMU: u8 = 0;

/// RTP fixed header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub padding: bool,
    pub extension: bool,
    pub csrc_count: u8,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Header for a PCMU packet from this sender
    pub fn new(sequence_number: u16, timestamp: u32, ssrc: u32) -> Self {
        Self {
            padding: false,
            extension: false,
            csrc_count: 0,
            marker: false,
            payload_type: PAYLOAD_TYPE_PCMU,
            sequence_number,
            timestamp,
            ssrc,
        }
    }

    /// Write the 12 header octets to `buf`
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        let b0 = (RTP_VERSION << 6)
            | (u8::from(self.padding) << 5)
            | (u8::from(self.extension) << 4)
            | (self.csrc_count & 0x0F);
        let b1 = (u8::from(self.marker) << 7) | (self.payload_type & 0x7F);

        buf.put_u8(b0);
        buf.put_u8(b1);
        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
    }

    /// Serialize into a fixed array
    pub fn to_bytes(&self) -> [u8; RTP_HEADER_LEN] {
        let mut out = [0u8; RTP_HEADER_LEN];
        self.write_to(&mut &mut out[..]);
        out
    }
}

/// One RTP datagram: header plus PCMU payload
#[derive(Debug, Clone)]
pub struct RtpPacket {
    pub header: RtpHeader,
    pub payload: Bytes,
}

impl RtpPacket {
    pub fn new(header: RtpHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Total datagram length in octets
    pub fn wire_len(&self) -> usize {
        RTP_HEADER_LEN + self.payload.len()
    }

    /// Concatenate header and payload into one datagram
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.header.write_to(&mut buf);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_header_bytes() {
        let header = RtpHeader::new(0x1234, 0x89AB_CDEF, 12345);
        assert_eq!(
            header.to_bytes(),
            [0x80, 0x00, 0x12, 0x34, 0x89, 0xAB, 0xCD, 0xEF, 0x00, 0x00, 0x30, 0x39]
        );
    }

    #[test]
    fn test_flag_bits() {
        let header = RtpHeader {
            padding: true,
            extension: true,
            csrc_count: 0x0F,
            marker: true,
            payload_type: 0x7F,
            ..RtpHeader::new(0, 0, 0)
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes[0], 0xBF);
        assert_eq!(bytes[1], 0xFF);
    }

    #[test]
    fn test_packet_encode() {
        let payload = Bytes::from_static(&[0xFF; 160]);
        let packet = RtpPacket::new(RtpHeader::new(7, 160, 1), payload);
        let datagram = packet.encode();

        assert_eq!(packet.wire_len(), 172);
        assert_eq!(datagram.len(), 172);
        assert_eq!(&datagram[..2], &[0x80, 0x00]);
        assert_eq!(&datagram[2..4], &7u16.to_be_bytes());
        assert!(datagram[RTP_HEADER_LEN..].iter().all(|&b| b == 0xFF));
    }

    proptest! {
        #[test]
        fn prop_fields_land_at_fixed_offsets(seq in any::<u16>(), ts in any::<u32>(), ssrc in any::<u32>()) {
            let bytes = RtpHeader::new(seq, ts, ssrc).to_bytes();
            prop_assert_eq!(bytes[0], 0x80);
            prop_assert_eq!(bytes[1], PAYLOAD_TYPE_PCMU);
            prop_assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), seq);
            prop_assert_eq!(u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), ts);
            prop_assert_eq!(u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), ssrc);
        }
    }
}
