//! G.711 µ-law companding
//!
//! Maps one 16-bit linear sample to one compressed octet. The output is the
//! ones'-complement of `sign | segment << 4 | mantissa`, which is what every
//! conforming PCMU decoder expects on the wire.

use bytes::BufMut;

/// Bias added to the magnitude before segmenting.
pub const BIAS: i32 = 0x84;

/// Largest magnitude whose biased value still fits the top segment.
pub const CLIP: i32 = 0x7FFF - BIAS;

/// Encoded value of digital silence.
pub const SILENCE: u8 = 0xFF;

/// Encode a single linear sample.
#[inline]
pub fn encode(sample: i16) -> u8 {
    let sample = i32::from(sample);
    let sign = (sample >> 8) & 0x80;
    let magnitude = if sign != 0 { -sample } else { sample };
    let biased = magnitude.min(CLIP) + BIAS;

    let mut exponent = 7;
    while exponent > 0 && biased < 1 << (exponent + 7) {
        exponent -= 1;
    }

    let mantissa = (biased >> (exponent + 3)) & 0x0F;
    !((sign | (exponent << 4) | mantissa) as u8)
}

/// Encode a block of samples, appending one octet per sample to `out`.
pub fn encode_block<B: BufMut>(samples: &[i16], out: &mut B) {
    for &sample in samples {
        out.put_u8(encode(sample));
    }
}
