//! Policy-driven datagram submission
//!
//! Every channel carries an explicit [`SendPolicy`]: how many times a failed
//! send is retried, and whether exhausting the retries aborts the stream or
//! drops the datagram.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_PACKET_SIZE;
use crate::error::{Channel, NetworkError};
use crate::network::DatagramSink;

/// What happens once a send has failed `retries + 1` times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureAction {
    /// Stop the stream with a fatal error
    #[default]
    Abort,
    /// Drop this datagram and carry on
    Skip,
}

/// Per-channel send failure policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendPolicy {
    /// Immediate retries after the first failed attempt
    pub retries: u32,
    pub on_failure: FailureAction,
}

impl SendPolicy {
    /// Fail fast: one attempt, then abort
    pub const fn fail_fast() -> Self {
        Self {
            retries: 0,
            on_failure: FailureAction::Abort,
        }
    }

    /// Best effort: `retries` extra attempts, then drop
    pub const fn best_effort(retries: u32) -> Self {
        Self {
            retries,
            on_failure: FailureAction::Skip,
        }
    }
}

/// Result of a non-fatal submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the transport after this many attempts
    Sent { attempts: u32 },
    /// Dropped under a `Skip` policy
    Skipped,
}

/// Sender statistics
#[derive(Debug, Clone, Default)]
pub struct SenderStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub send_errors: u64,
    pub packets_dropped: u64,
}

/// A datagram sink bound to its channel identity and failure policy
pub struct ChannelSender<S> {
    sink: S,
    channel: Channel,
    policy: SendPolicy,
    stats: SenderStats,
}

impl<S: DatagramSink> ChannelSender<S> {
    pub fn new(sink: S, channel: Channel, policy: SendPolicy) -> Self {
        Self {
            sink,
            channel,
            policy,
            stats: SenderStats::default(),
        }
    }

    /// Submit one datagram under this channel's policy.
    ///
    /// Returns `Err` only when the policy is `Abort` and every attempt failed.
    pub fn deliver(&mut self, datagram: &[u8]) -> Result<Delivery, NetworkError> {
        if datagram.len() > MAX_PACKET_SIZE {
            return Err(NetworkError::PacketTooLarge(datagram.len()));
        }

        let max_attempts = self.policy.retries.saturating_add(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.sink.send(datagram) {
                Ok(()) => {
                    self.stats.packets_sent += 1;
                    self.stats.bytes_sent += datagram.len() as u64;
                    return Ok(Delivery::Sent { attempts });
                }
                Err(e) => {
                    self.stats.send_errors += 1;
                    if attempts < max_attempts {
                        tracing::warn!(
                            "{} send to {} failed (attempt {}/{}): {}",
                            self.channel,
                            self.sink.peer(),
                            attempts,
                            max_attempts,
                            e
                        );
                        continue;
                    }

                    return match self.policy.on_failure {
                        FailureAction::Abort => Err(NetworkError::SendFailed {
                            channel: self.channel,
                            dest: self.sink.peer(),
                            attempts,
                            source: e,
                        }),
                        FailureAction::Skip => {
                            self.stats.packets_dropped += 1;
                            tracing::warn!(
                                "{} send to {} failed, dropping datagram: {}",
                                self.channel,
                                self.sink.peer(),
                                e
                            );
                            Ok(Delivery::Skipped)
                        }
                    };
                }
            }
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
