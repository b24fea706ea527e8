//! Block encoder wrapper
//!
//! Turns one captured block into a PCMU payload and keeps running totals.

use bytes::{Bytes, BytesMut};

use crate::codec::ulaw;

/// µ-law block encoder with statistics
pub struct UlawEncoder {
    /// Encoding buffer (reused to avoid allocations)
    encode_buffer: BytesMut,
    /// Frame counter for statistics
    frames_encoded: u64,
    /// Total bytes produced
    bytes_produced: u64,
}

impl UlawEncoder {
    /// Create an encoder sized for `block_size` samples per frame
    pub fn new(block_size: usize) -> Self {
        Self {
            encode_buffer: BytesMut::with_capacity(block_size),
            frames_encoded: 0,
            bytes_produced: 0,
        }
    }

    /// Encode a block of samples to PCMU, one octet per sample.
    pub fn encode(&mut self, samples: &[i16]) -> Bytes {
        self.encode_buffer.reserve(samples.len());
        ulaw::encode_block(samples, &mut self.encode_buffer);

        self.frames_encoded += 1;
        self.bytes_produced += samples.len() as u64;

        self.encode_buffer.split().freeze()
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
            average_frame_size: if self.frames_encoded > 0 {
                self.bytes_produced as f32 / self.frames_encoded as f32
            } else {
                0.0
            },
        }
    }
}

/// Encoder statistics
#[derive(Debug, Clone)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
    pub average_frame_size: f32,
}
