//! Per-stream RTP session state
//!
//! One [`SessionState`] exists per stream. It is owned by the
//! [`Streamer`](crate::stream::Streamer) and only changes when a packet is
//! handed to the transport (or deliberately dropped).

use crate::config::StreamConfig;
use crate::protocol::{NtpTimestamp, RtpHeader, SenderReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    sequence_number: u16,
    timestamp: u32,
    ssrc: u32,
    packet_count: u32,
    octet_count: u32,
    since_report: u32,
}

impl SessionState {
    pub fn new(ssrc: u32, initial_sequence: u16) -> Self {
        Self {
            sequence_number: initial_sequence,
            timestamp: 0,
            ssrc,
            packet_count: 0,
            octet_count: 0,
            since_report: 0,
        }
    }

    /// Fresh session using configured identifiers, or random ones where unset
    pub fn from_config(config: &StreamConfig) -> Self {
        let ssrc = config.ssrc.unwrap_or_else(rand::random);
        let initial_sequence = config.initial_sequence.unwrap_or_else(rand::random);
        Self::new(ssrc, initial_sequence)
    }

    /// Header for the next packet
    pub fn header(&self) -> RtpHeader {
        RtpHeader::new(self.sequence_number, self.timestamp, self.ssrc)
    }

    /// Account for one packet handed to the transport
    pub fn advance(&mut self, samples: u32, payload_octets: u32) {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(samples);
        self.packet_count = self.packet_count.wrapping_add(1);
        self.octet_count = self.octet_count.wrapping_add(payload_octets);
        self.since_report = self.since_report.saturating_add(1);
    }

    /// Account for samples consumed by a packet that was dropped.
    ///
    /// Media time moves on; the sequence number and counters do not.
    pub fn skip(&mut self, samples: u32) {
        self.timestamp = self.timestamp.wrapping_add(samples);
    }

    /// True once `interval` packets have been sent since the last report.
    ///
    /// Counted separately from `packet_count`, so the cadence survives the
    /// counter wrapping.
    pub fn report_due(&self, interval: u32) -> bool {
        interval != 0 && self.since_report >= interval
    }

    /// Restart the report interval
    pub fn mark_reported(&mut self) {
        self.since_report = 0;
    }

    pub fn sender_report(&self, ntp: NtpTimestamp) -> SenderReport {
        SenderReport::new(self.ssrc, ntp, self.timestamp, self.packet_count, self.octet_count)
    }

    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn packet_count(&self) -> u32 {
        self.packet_count
    }

    pub fn octet_count(&self) -> u32 {
        self.octet_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_session() {
        let session = SessionState::new(12345, 100);
        assert_eq!(session.sequence_number(), 100);
        assert_eq!(session.timestamp(), 0);
        assert_eq!(session.packet_count(), 0);
        assert_eq!(session.octet_count(), 0);
        assert_eq!(session.header(), RtpHeader::new(100, 0, 12345));
    }

    #[test]
    fn test_sequence_wraps() {
        let mut session = SessionState::new(1, u16::MAX);
        session.advance(160, 160);
        assert_eq!(session.sequence_number(), 0);
    }

    #[test]
    fn test_timestamp_wraps() {
        let mut session = SessionState::new(1, 0);
        session.timestamp = u32::MAX - 99;
        session.advance(160, 160);
        assert_eq!(session.timestamp(), 60);
    }

    #[test]
    fn test_skip_only_moves_media_time() {
        let mut session = SessionState::new(1, 7);
        session.skip(160);
        assert_eq!(session.timestamp(), 160);
        assert_eq!(session.sequence_number(), 7);
        assert_eq!(session.packet_count(), 0);
        assert_eq!(session.octet_count(), 0);
    }

    #[test]
    fn test_report_due() {
        let mut session = SessionState::new(1, 0);
        assert!(!session.report_due(50));
        for _ in 0..49 {
            session.advance(160, 160);
            assert!(!session.report_due(50));
        }
        session.advance(160, 160);
        assert!(session.report_due(50));
        session.mark_reported();
        session.advance(160, 160);
        assert!(!session.report_due(50));
    }

    #[test]
    fn test_report_due_across_packet_count_wrap() {
        let mut session = SessionState::new(1, 0);
        session.packet_count = u32::MAX - 9;
        for _ in 0..9 {
            session.advance(160, 160);
        }
        session.mark_reported();

        // packet_count passes through 0 inside this interval
        for _ in 0..49 {
            session.advance(160, 160);
            assert!(!session.report_due(50));
        }
        session.advance(160, 160);
        assert_eq!(session.packet_count(), 49);
        assert!(session.report_due(50));
    }

    #[test]
    fn test_sender_report_snapshot() {
        let mut session = SessionState::new(0xCAFE, 0);
        session.advance(160, 160);
        session.advance(97, 97);

        let ntp = NtpTimestamp::from_unix(10, 0);
        let report = session.sender_report(ntp);
        assert_eq!(report, SenderReport::new(0xCAFE, ntp, 257, 2, 257));
    }

    #[test]
    fn test_from_config_uses_fixed_ids() {
        let config = StreamConfig {
            ssrc: Some(42),
            initial_sequence: Some(9),
            ..StreamConfig::default()
        };
        let session = SessionState::from_config(&config);
        assert_eq!(session.ssrc(), 42);
        assert_eq!(session.sequence_number(), 9);
    }

    proptest! {
        #[test]
        fn prop_counters_after_k_packets(start in any::<u16>(), k in 0u32..5000, block in 1u32..2000) {
            let mut session = SessionState::new(1, start);
            for _ in 0..k {
                session.advance(block, block);
            }
            prop_assert_eq!(u32::from(session.sequence_number()), (u32::from(start) + k) % 65536);
            prop_assert_eq!(u64::from(session.timestamp()), (u64::from(k) * u64::from(block)) % (1 << 32));
            prop_assert_eq!(session.packet_count(), k);
        }
    }
}
