//! Audio capture from an input device
//!
//! The cpal stream lives on its own thread for its whole lifetime; the
//! callback down-mixes to mono, converts to i16, and pushes into a
//! [`SharedSampleRing`].

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::SharedSampleRing;
use crate::audio::device::{choose_input_config, find_input_device};
use crate::error::AudioError;

/// How long `start` waits for the device thread to report the stream is live
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Audio capture instance for a single device
pub struct AudioCapture {
    /// Device name, `None` for the system default
    device_name: Option<String>,

    /// Requested capture rate
    sample_rate: u32,

    /// Whether capture is running
    running: Arc<AtomicBool>,

    /// Output buffer for captured samples
    output_buffer: SharedSampleRing,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,

    /// Total mono samples captured
    samples_captured: Arc<AtomicU64>,
}

impl AudioCapture {
    pub fn new(device_name: Option<&str>, sample_rate: u32, output_buffer: SharedSampleRing) -> Self {
        Self {
            device_name: device_name.map(str::to_string),
            sample_rate,
            running: Arc::new(AtomicBool::new(false)),
            output_buffer,
            thread_handle: None,
            error_rx: None,
            samples_captured: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open and configure the device, then start capturing.
    ///
    /// Returns once the stream is playing, or with the error that stopped it.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (error_tx, error_rx) = bounded::<AudioError>(16);
        let (ready_tx, ready_rx) = bounded::<Result<String, AudioError>>(1);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let output_buffer = self.output_buffer.clone();
        let samples_captured = self.samples_captured.clone();
        let device_name = self.device_name.clone();
        let sample_rate = self.sample_rate;

        self.samples_captured.store(0, Ordering::SeqCst);
        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(
                    device_name.as_deref(),
                    sample_rate,
                    running.clone(),
                    output_buffer,
                    samples_captured,
                    error_tx,
                ) {
                    Ok((stream, description)) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                            return;
                        }
                        let _ = ready_tx.send(Ok(description));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Keep thread alive while running
                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }

                // Stream is dropped here, stopping capture
                drop(stream);
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(description)) => {
                tracing::info!("Audio capture started: {}", description);
                Ok(())
            }
            Ok(Err(e)) => {
                self.stop();
                Err(e)
            }
            Err(_) => {
                self.detach();
                Err(AudioError::StreamError("device did not start in time".to_string()))
            }
        }
    }

    /// Give up on a capture thread that never reported in.
    ///
    /// The thread may be stuck inside the driver, so it is not joined. It
    /// keeps the old (now cleared) running flag and exits on its own if the
    /// driver ever returns; a later `start` gets a fresh flag.
    fn detach(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.running = Arc::new(AtomicBool::new(false));
        self.thread_handle = None;
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if capture is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get total samples captured
    pub fn samples_captured(&self) -> u64 {
        self.samples_captured.load(Ordering::Relaxed)
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Check for errors
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(
    device_name: Option<&str>,
    sample_rate: u32,
    running: Arc<AtomicBool>,
    output_buffer: SharedSampleRing,
    samples_captured: Arc<AtomicU64>,
    error_tx: Sender<AudioError>,
) -> Result<(cpal::Stream, String), AudioError> {
    let device = find_input_device(device_name)?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let (config, format) = choose_input_config(&device, sample_rate)?;

    let description = format!(
        "{} @ {} Hz, {} channel(s), {:?}",
        name, config.sample_rate.0, config.channels, format
    );

    let stream = match format {
        SampleFormat::I16 => build_stream::<i16>(&device, &config, running, output_buffer, samples_captured, error_tx),
        SampleFormat::F32 => build_stream::<f32>(&device, &config, running, output_buffer, samples_captured, error_tx),
        other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
    }?;

    Ok((stream, description))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    running: Arc<AtomicBool>,
    output_buffer: SharedSampleRing,
    samples_captured: Arc<AtomicU64>,
    error_tx: Sender<AudioError>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + ToMonoSample,
{
    let channels = usize::from(config.channels.max(1));
    let mut mono: Vec<i16> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    return;
                }

                mono.clear();
                mono.extend(data.chunks(channels).map(T::downmix));

                samples_captured.fetch_add(mono.len() as u64, Ordering::Relaxed);

                // Drops on overflow; the consumer sees it as an overrun
                output_buffer.push_slice(&mono);
            },
            move |err| {
                let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))
}

/// Conversion of one interleaved frame to a mono i16 sample
pub trait ToMonoSample: Copy {
    fn downmix(frame: &[Self]) -> i16;
}

impl ToMonoSample for i16 {
    fn downmix(frame: &[i16]) -> i16 {
        if let [only] = frame {
            return *only;
        }
        let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
        (sum / frame.len().max(1) as i32) as i16
    }
}

impl ToMonoSample for f32 {
    fn downmix(frame: &[f32]) -> i16 {
        let mean = frame.iter().sum::<f32>() / frame.len().max(1) as f32;
        (mean.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::create_shared_ring;

    #[test]
    fn test_downmix_i16() {
        assert_eq!(i16::downmix(&[1234]), 1234);
        assert_eq!(i16::downmix(&[100, 300]), 200);
        assert_eq!(i16::downmix(&[i16::MAX, i16::MAX]), i16::MAX);
        assert_eq!(i16::downmix(&[i16::MIN, i16::MIN]), i16::MIN);
    }

    #[test]
    fn test_downmix_f32_saturates() {
        assert_eq!(f32::downmix(&[0.0]), 0);
        assert_eq!(f32::downmix(&[1.0]), i16::MAX);
        assert_eq!(f32::downmix(&[4.0, 4.0]), i16::MAX);
        assert_eq!(f32::downmix(&[-2.0]), -i16::MAX);
        assert_eq!(f32::downmix(&[0.5, -0.5]), 0);
    }

    #[test]
    fn test_capture_creation() {
        let capture = AudioCapture::new(None, 8000, create_shared_ring(1280));
        assert!(!capture.is_running());
        assert_eq!(capture.sample_rate(), 8000);
        assert_eq!(capture.samples_captured(), 0);
        assert!(capture.check_errors().is_none());
    }

    #[test]
    fn test_detach_does_not_wait_for_stuck_thread() {
        let mut capture = AudioCapture::new(None, 8000, create_shared_ring(1280));
        let old_flag = capture.running.clone();
        old_flag.store(true, Ordering::SeqCst);

        // Stands in for a driver call that never returns
        let (release_tx, release_rx) = bounded::<()>(0);
        capture.thread_handle = Some(thread::spawn(move || {
            let _ = release_rx.recv();
        }));

        let started = std::time::Instant::now();
        capture.detach();
        assert!(started.elapsed() < Duration::from_secs(1));

        assert!(capture.thread_handle.is_none());
        assert!(!capture.is_running());
        assert!(!old_flag.load(Ordering::SeqCst));
        assert!(!Arc::ptr_eq(&old_flag, &capture.running));

        drop(release_tx);
    }
}
