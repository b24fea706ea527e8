//! G.711 µ-law codec
//!
//! Provides the per-sample companding function and a block encoder
//! that produces RTP payloads.

pub mod encoder;
pub mod ulaw;

pub use encoder::{EncoderStats, UlawEncoder};
