//! Block-oriented audio source
//!
//! The streaming loop pulls fixed-size blocks through [`AudioSource`];
//! [`CaptureSource`] implements it on top of a live [`AudioCapture`].

use std::time::{Duration, Instant};
use thiserror::Error;

use crate::audio::buffer::{create_shared_ring, SharedSampleRing};
use crate::audio::capture::AudioCapture;
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Recoverable read failures
#[derive(Error, Debug)]
pub enum ReadError {
    /// Samples were lost because the reader fell behind; call
    /// [`AudioSource::prepare`] before reading again
    #[error("overrun")]
    Overrun,

    #[error("no samples within {0:?}")]
    Timeout(Duration),

    #[error("device error: {0}")]
    Device(String),
}

/// A device yielding 16-bit signed mono samples at a fixed rate
pub trait AudioSource {
    /// Fill `buf` with up to `buf.len()` samples, returning how many were read.
    ///
    /// A return value below `buf.len()` is a short read.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, ReadError>;

    /// Re-arm the device after an overrun
    fn prepare(&mut self) -> Result<(), AudioError>;
}

/// Block reads from a [`SampleRing`](crate::audio::SampleRing) with overrun
/// detection. Holds no device, so it can be driven from tests directly.
pub struct RingReader {
    ring: SharedSampleRing,
    read_timeout: Duration,
    seen_overflows: usize,
}

impl RingReader {
    pub fn new(ring: SharedSampleRing, read_timeout: Duration) -> Self {
        let seen_overflows = ring.overflow_count();
        Self {
            ring,
            read_timeout,
            seen_overflows,
        }
    }

    /// Wait up to the read timeout for `buf.len()` samples.
    ///
    /// This blocks the calling thread. At the default 60 ms timeout that is
    /// at most three frames, which the stream loop tolerates as its device
    /// read.
    pub fn read(&mut self, buf: &mut [i16]) -> Result<usize, ReadError> {
        if self.overrun() {
            return Err(ReadError::Overrun);
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut filled = 0;
        loop {
            filled += self.ring.pop_into(&mut buf[filled..]);
            if filled == buf.len() || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        if filled == 0 {
            return Err(ReadError::Timeout(self.read_timeout));
        }
        Ok(filled)
    }

    /// True when samples were dropped since the last [`reset`](Self::reset)
    pub fn overrun(&self) -> bool {
        self.ring.overflow_count() != self.seen_overflows
    }

    /// Drop buffered samples and take the current overflow count as baseline
    pub fn reset(&mut self) {
        self.ring.clear();
        self.seen_overflows = self.ring.overflow_count();
    }

    pub fn ring(&self) -> &SharedSampleRing {
        &self.ring
    }
}

/// [`AudioSource`] backed by a cpal capture thread
pub struct CaptureSource {
    capture: AudioCapture,
    reader: RingReader,
}

impl CaptureSource {
    /// Open the configured device and start capturing.
    ///
    /// `block_size` sizes the ring at `ring_capacity_blocks` blocks.
    pub fn open(config: &AudioConfig, block_size: usize) -> Result<Self, AudioError> {
        let ring = create_shared_ring(block_size * config.ring_capacity_blocks);
        let mut capture = AudioCapture::new(config.device.as_deref(), config.sample_rate, ring.clone());
        capture.start()?;

        Ok(Self {
            capture,
            reader: RingReader::new(ring, Duration::from_millis(config.read_timeout_ms)),
        })
    }

    pub fn samples_captured(&self) -> u64 {
        self.capture.samples_captured()
    }

    /// Fraction of the capture ring currently holding samples
    pub fn ring_fill_level(&self) -> f32 {
        self.reader.ring().fill_level()
    }
}

impl AudioSource for CaptureSource {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, ReadError> {
        if self.reader.overrun() {
            return Err(ReadError::Overrun);
        }
        if let Some(err) = self.capture.check_errors() {
            return Err(ReadError::Device(err.to_string()));
        }
        self.reader.read(buf)
    }

    fn prepare(&mut self) -> Result<(), AudioError> {
        if !self.capture.is_running() {
            self.capture.start()?;
        }
        self.reader.reset();
        Ok(())
    }
}

impl AudioSource for RingReader {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, ReadError> {
        RingReader::read(self, buf)
    }

    fn prepare(&mut self) -> Result<(), AudioError> {
        self.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: usize = 160;
    const TIMEOUT: Duration = Duration::from_millis(5);

    fn reader(capacity: usize) -> RingReader {
        RingReader::new(create_shared_ring(capacity), TIMEOUT)
    }

    #[test]
    fn test_full_block_read() {
        let mut reader = reader(BLOCK * 4);
        let samples: Vec<i16> = (0..BLOCK as i16).collect();
        reader.ring().push_slice(&samples);

        let mut buf = [0i16; BLOCK];
        assert_eq!(reader.read(&mut buf).unwrap(), BLOCK);
        assert_eq!(&buf[..], &samples[..]);
    }

    #[test]
    fn test_overflow_reports_overrun_until_prepared() {
        let mut reader = reader(BLOCK);
        reader.ring().push_slice(&[1; BLOCK + 10]);

        let mut buf = [0i16; BLOCK];
        assert!(matches!(reader.read(&mut buf), Err(ReadError::Overrun)));
        // Stays latched without a prepare
        assert!(matches!(reader.read(&mut buf), Err(ReadError::Overrun)));

        AudioSource::prepare(&mut reader).unwrap();
        assert!(reader.ring().is_empty());
        assert!(!reader.overrun());

        reader.ring().push_slice(&[2; BLOCK]);
        assert_eq!(reader.read(&mut buf).unwrap(), BLOCK);
        assert!(buf.iter().all(|&s| s == 2));
    }

    #[test]
    fn test_short_read_returns_available_samples() {
        let mut reader = reader(BLOCK * 4);
        reader.ring().push_slice(&[5; BLOCK / 2]);

        let mut buf = [0i16; BLOCK];
        assert_eq!(reader.read(&mut buf).unwrap(), BLOCK / 2);
        assert!(buf[..BLOCK / 2].iter().all(|&s| s == 5));
    }

    #[test]
    fn test_empty_ring_times_out() {
        let mut reader = reader(BLOCK * 4);
        let mut buf = [0i16; BLOCK];

        let started = Instant::now();
        assert!(matches!(reader.read(&mut buf), Err(ReadError::Timeout(t)) if t == TIMEOUT));
        assert!(started.elapsed() >= TIMEOUT);
    }

    #[test]
    fn test_baseline_taken_at_creation() {
        let ring = create_shared_ring(2);
        ring.push_slice(&[1, 2, 3]);
        ring.clear();

        let mut reader = RingReader::new(ring, TIMEOUT);
        reader.ring().push_slice(&[9]);
        let mut buf = [0i16; 1];
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
    }
}
