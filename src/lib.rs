//! # µ-law RTP Sender
//!
//! Captures mono audio, encodes it as G.711 µ-law (PCMU) and streams it as
//! RTP over UDP, with periodic RTCP Sender Reports on a companion port.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                             SENDER                                    │
//! │  ┌─────────────┐    cpal callback    ┌───────────────────────────┐    │
//! │  │ Input device│ ──────────────────▶ │ SampleRing (audio::buffer)│    │
//! │  └─────────────┘   capture thread    └────────────┬──────────────┘    │
//! │                                                   │ read(block)       │
//! │                                                   ▼                   │
//! │  ┌─────────────────────────────────────────────────────────────────┐  │
//! │  │                 Streamer (stream::scheduler)                    │  │
//! │  │   ┌───────────┐    ┌────────────┐    ┌────────────────────┐     │  │
//! │  │   │   Pacer   │    │ UlawEncoder│    │   SessionState     │     │  │
//! │  │   │ (20 ms)   │    │  (codec)   │    │ seq / ts / counts  │     │  │
//! │  │   └───────────┘    └────────────┘    └────────────────────┘     │  │
//! │  └───────────────┬───────────────────────────────┬─────────────────┘  │
//! │                  │ RTP (PT 0)                    │ RTCP SR (PT 200)   │
//! │                  ▼                               ▼                    │
//! │  ┌──────────────────────────┐    ┌──────────────────────────┐         │
//! │  │ UdpChannel :port         │    │ UdpChannel :port+1       │         │
//! │  └────────────┬─────────────┘    └────────────┬─────────────┘         │
//! └───────────────┼───────────────────────────────┼───────────────────────┘
//!                 │            UDP                │
//!                 ▼                               ▼
//!            RTP receiver                   RTCP receiver
//! ```

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod stream;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate; also the RTP clock rate for PCMU
    pub const DEFAULT_SAMPLE_RATE: u32 = 8000;

    /// Default samples per packet (20 ms at 8 kHz)
    pub const DEFAULT_PAYLOAD_SIZE: usize = 160;

    /// Default destination port for RTP; RTCP uses the next port up
    pub const DEFAULT_RTP_PORT: u16 = 5004;

    /// Default number of RTP packets between Sender Reports
    pub const DEFAULT_REPORT_INTERVAL: u32 = 50;

    /// Default number of RTP packets between stats log lines
    pub const DEFAULT_STATS_LOG_INTERVAL: u32 = 500;

    /// Default time a block read may wait for samples
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 60;

    /// Default capture ring size, in blocks
    pub const DEFAULT_RING_CAPACITY_BLOCKS: usize = 8;

    /// Maximum packet size for UDP
    pub const MAX_PACKET_SIZE: usize = 1472; // MTU - IP/UDP headers

    /// Largest payload that fits in one datagram after the RTP header
    pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - crate::protocol::rtp::RTP_HEADER_LEN;
}
