//! The streaming loop
//!
//! ```text
//!            ┌────────────────────────── overrun: prepare() ─┐
//!            ▼                                               │
//!   ┌──────────────┐  read ok   ┌──────────────┐             │
//!   │   Running    │───────────▶│ encode, send │             │
//!   └──────────────┘            └──────┬───────┘             │
//!        ▲     ▲                       │ every N packets     │
//!        │     │                       ▼                     │
//!        │     │                ┌──────────────┐             │
//!        │     └────────────────│  send SR     │             │
//!        │                      └──────────────┘             │
//!        │  read ok      ┌──────────────┐                    │
//!        └───────────────│  Recovering  │◀───────────────────┘
//!                        └──────────────┘
//! ```
//!
//! [`Streamer::step`] runs one iteration without sleeping so the whole
//! pipeline can be driven deterministically; [`Streamer::run`] adds pacing
//! and shutdown.

use std::future::Future;
use std::time::Duration;

use crate::audio::{AudioSource, ReadError};
use crate::codec::UlawEncoder;
use crate::config::AppConfig;
use crate::error::{Channel, Result};
use crate::network::{ChannelSender, DatagramSink, Delivery, SenderStats};
use crate::protocol::{NtpTimestamp, RtpPacket};
use crate::stream::pacer::Pacer;
use crate::stream::session::SessionState;

/// Device state as seen by the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Running,
    /// An overrun was seen and the source re-prepared; the next good read
    /// returns to `Running`
    Recovering,
}

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An RTP packet was handed to the transport
    Sent {
        sequence_number: u16,
        samples: usize,
        report_sent: bool,
    },
    /// Overrun; source re-prepared, nothing sent
    Overrun,
    /// Read failed or returned nothing; nothing sent
    ReadFailed,
    /// Packet built but dropped under a `Skip` send policy
    Dropped,
}

/// Loop statistics
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub iterations: u64,
    pub overruns: u64,
    pub read_errors: u64,
    pub short_reads: u64,
    pub packets_dropped: u64,
    pub reports_sent: u64,
    pub reports_dropped: u64,
}

/// Single-stream RTP sender loop
pub struct Streamer<A, R, C> {
    source: A,
    rtp: ChannelSender<R>,
    rtcp: ChannelSender<C>,
    session: SessionState,
    encoder: UlawEncoder,
    block: Vec<i16>,
    state: StreamState,
    report_interval: u32,
    stats_log_interval: u32,
    frame_duration: Duration,
    clock: fn() -> NtpTimestamp,
    stats: StreamStats,
}

impl<A, R, C> Streamer<A, R, C>
where
    A: AudioSource,
    R: DatagramSink,
    C: DatagramSink,
{
    /// Assemble a stream from its collaborators. `config` should already be
    /// validated.
    pub fn new(source: A, rtp_sink: R, rtcp_sink: C, config: &AppConfig) -> Self {
        let stream = &config.stream;
        Self {
            source,
            rtp: ChannelSender::new(rtp_sink, Channel::Rtp, stream.rtp_send),
            rtcp: ChannelSender::new(rtcp_sink, Channel::Rtcp, stream.rtcp_send),
            session: SessionState::from_config(stream),
            encoder: UlawEncoder::new(stream.payload_size),
            block: vec![0; stream.payload_size],
            state: StreamState::Running,
            report_interval: stream.report_interval.max(1),
            stats_log_interval: stream.stats_log_interval,
            frame_duration: config.frame_duration(),
            clock: NtpTimestamp::now,
            stats: StreamStats::default(),
        }
    }

    /// Replace the wall clock used for Sender Reports
    pub fn with_clock(mut self, clock: fn() -> NtpTimestamp) -> Self {
        self.clock = clock;
        self
    }

    /// Run one iteration: read, encode, send, maybe report.
    ///
    /// Only fatal errors are returned; overruns, read failures and skipped
    /// sends are absorbed and reported through [`StepOutcome`].
    pub fn step(&mut self) -> Result<StepOutcome> {
        self.stats.iterations += 1;

        let read = match self.source.read(&mut self.block) {
            Ok(0) => {
                tracing::warn!("Read returned no samples");
                self.stats.read_errors += 1;
                return Ok(StepOutcome::ReadFailed);
            }
            Ok(n) => n,
            Err(ReadError::Overrun) => {
                tracing::warn!("Overrun occurred, re-preparing source");
                self.stats.overruns += 1;
                self.state = StreamState::Recovering;
                if let Err(e) = self.source.prepare() {
                    tracing::warn!("Failed to re-prepare source: {}", e);
                }
                return Ok(StepOutcome::Overrun);
            }
            Err(e) => {
                tracing::warn!("Error from read: {}", e);
                self.stats.read_errors += 1;
                return Ok(StepOutcome::ReadFailed);
            }
        };

        if self.state == StreamState::Recovering {
            tracing::info!("Source recovered");
            self.state = StreamState::Running;
        }
        if read < self.block.len() {
            tracing::warn!("Short read, read {} of {} samples", read, self.block.len());
            self.stats.short_reads += 1;
        }

        let payload = self.encoder.encode(&self.block[..read]);
        let header = self.session.header();
        let packet = RtpPacket::new(header, payload);

        match self.rtp.deliver(&packet.encode())? {
            Delivery::Sent { .. } => {
                tracing::trace!("RTP packet {} sent", header.sequence_number);
                self.session.advance(read as u32, packet.payload.len() as u32);
            }
            Delivery::Skipped => {
                self.session.skip(read as u32);
                self.stats.packets_dropped += 1;
                return Ok(StepOutcome::Dropped);
            }
        }

        let report_sent = if self.session.report_due(self.report_interval) {
            self.send_report()?
        } else {
            false
        };

        if self.stats_log_interval != 0 && self.session.packet_count() % self.stats_log_interval == 0 {
            self.log_stats();
        }

        Ok(StepOutcome::Sent {
            sequence_number: header.sequence_number,
            samples: read,
            report_sent,
        })
    }

    fn send_report(&mut self) -> Result<bool> {
        let report = self.session.sender_report((self.clock)());
        self.session.mark_reported();
        match self.rtcp.deliver(&report.encode())? {
            Delivery::Sent { .. } => {
                tracing::debug!(
                    "RTCP SR sent: packets={} octets={} rtp_ts={}",
                    report.packet_count,
                    report.octet_count,
                    report.rtp_timestamp
                );
                self.stats.reports_sent += 1;
                Ok(true)
            }
            Delivery::Skipped => {
                self.stats.reports_dropped += 1;
                Ok(false)
            }
        }
    }

    /// Stream until `shutdown` resolves or a fatal error occurs.
    ///
    /// Iterations are paced to one frame duration each.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<StreamStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut pacer = Pacer::new(self.frame_duration);

        tracing::info!(
            "Streaming: ssrc={:#010x} first seq={} frame={:?} report every {} packets",
            self.session.ssrc(),
            self.session.sequence_number(),
            self.frame_duration,
            self.report_interval
        );

        loop {
            self.step()?;

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = pacer.wait() => {}
            }
        }

        if pacer.late_ticks() > 0 {
            tracing::info!("Pacing fell behind {} time(s)", pacer.late_ticks());
        }
        self.log_stats();
        Ok(self.stats.clone())
    }

    fn log_stats(&self) {
        let encoder = self.encoder.stats();
        tracing::info!(
            "Stats: {} packets, {} octets, {} reports, {} overruns, {} short reads, {} read errors, avg payload {:.0} bytes",
            self.session.packet_count(),
            self.session.octet_count(),
            self.stats.reports_sent,
            self.stats.overruns,
            self.stats.short_reads,
            self.stats.read_errors,
            encoder.average_frame_size
        );
        for (channel, stats) in [
            (self.rtp.channel(), self.rtp.stats()),
            (self.rtcp.channel(), self.rtcp.stats()),
        ] {
            if stats.send_errors > 0 || stats.packets_dropped > 0 {
                tracing::info!(
                    "{}: {:.1} KB sent, {} send errors, {} dropped",
                    channel,
                    stats.bytes_sent as f64 / 1024.0,
                    stats.send_errors,
                    stats.packets_dropped
                );
            } else {
                tracing::info!("{}: {:.1} KB sent", channel, stats.bytes_sent as f64 / 1024.0);
            }
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn source(&self) -> &A {
        &self.source
    }

    pub fn rtp_stats(&self) -> &SenderStats {
        self.rtp.stats()
    }

    pub fn rtcp_stats(&self) -> &SenderStats {
        self.rtcp.stats()
    }

    pub fn rtp_sink(&self) -> &R {
        self.rtp.sink()
    }

    pub fn rtcp_sink(&self) -> &C {
        self.rtcp.sink()
    }

    pub fn rtp_sink_mut(&mut self) -> &mut R {
        self.rtp.sink_mut()
    }

    pub fn rtcp_sink_mut(&mut self) -> &mut C {
        self.rtcp.sink_mut()
    }
}
