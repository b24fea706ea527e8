//! RTCP Sender Report (RFC 3550 §6.4.1) without reception report blocks
//!
//! ```text
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|  RC=0   |   PT=SR=200   |          length=6             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         SSRC of sender                        |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! |              NTP timestamp, most significant word             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |             NTP timestamp, least significant word             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         RTP timestamp                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     sender's packet count                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      sender's octet count                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use bytes::{BufMut, Bytes};
use chrono::{DateTime, Utc};

use super::RTP_VERSION;

/// Packet type code for a Sender Report
pub const RTCP_PT_SR: u8 = 200;

/// Size of a Sender Report with no report blocks
pub const SENDER_REPORT_LEN: usize = 28;

/// Length field value: total 32-bit words minus one
const SENDER_REPORT_WORDS: u16 = (SENDER_REPORT_LEN / 4 - 1) as u16;

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// 64-bit NTP fixed-point timestamp: 32.32 seconds since 1900-01-01
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NtpTimestamp(u64);

impl NtpTimestamp {
    /// Convert a Unix time to NTP.
    ///
    /// The fraction is `nanos * 2^32 / 10^9`, computed in u64 so no
    /// sub-second precision is lost.
    pub fn from_unix(secs: u64, nanos: u32) -> Self {
        let seconds = (secs + NTP_UNIX_OFFSET) << 32;
        let fraction = (u64::from(nanos) << 32) / 1_000_000_000;
        Self(seconds | fraction)
    }

    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        // Pre-1970 clocks are not meaningful here; pin them to the Unix epoch
        let secs = u64::try_from(time.timestamp()).unwrap_or(0);
        Self::from_unix(secs, time.timestamp_subsec_nanos().min(999_999_999))
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Integer seconds since 1900 (wraps in 2036, as the wire format does)
    pub fn seconds(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Binary fraction of a second
    pub fn fraction(&self) -> u32 {
        self.0 as u32
    }
}

/// RTCP Sender Report for a single media source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderReport {
    pub ssrc: u32,
    pub ntp_timestamp: NtpTimestamp,
    pub rtp_timestamp: u32,
    pub packet_count: u32,
    pub octet_count: u32,
}

impl SenderReport {
    pub fn new(
        ssrc: u32,
        ntp_timestamp: NtpTimestamp,
        rtp_timestamp: u32,
        packet_count: u32,
        octet_count: u32,
    ) -> Self {
        Self {
            ssrc,
            ntp_timestamp,
            rtp_timestamp,
            packet_count,
            octet_count,
        }
    }

    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        // V=2, P=0, RC=0
        buf.put_u8(RTP_VERSION << 6);
        buf.put_u8(RTCP_PT_SR);
        buf.put_u16(SENDER_REPORT_WORDS);
        buf.put_u32(self.ssrc);
        buf.put_u32(self.ntp_timestamp.seconds());
        buf.put_u32(self.ntp_timestamp.fraction());
        buf.put_u32(self.rtp_timestamp);
        buf.put_u32(self.packet_count);
        buf.put_u32(self.octet_count);
    }

    pub fn to_bytes(&self) -> [u8; SENDER_REPORT_LEN] {
        let mut out = [0u8; SENDER_REPORT_LEN];
        self.write_to(&mut &mut out[..]);
        out
    }

    pub fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&self.to_bytes())
    }
}
