//! Input device lookup and stream configuration

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig, SupportedStreamConfigRange};

use crate::error::AudioError;

/// Names of all input devices on the default host
pub fn list_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate input devices: {}", e);
            Vec::new()
        }
    }
}

/// Find an input device by name, or the default input when `name` is `None`
pub fn find_input_device(name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();

    let Some(name) = name else {
        return host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceNotFound("No default input device".to_string()));
    };

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

    for device in devices {
        if let Ok(device_name) = device.name() {
            if device_name == name {
                return Ok(device);
            }
        }
    }

    Err(AudioError::DeviceNotFound(name.to_string()))
}

/// Pick the capture configuration for `sample_rate`.
///
/// Mono is preferred over multi-channel and `i16` over `f32`; anything
/// else is converted in the callback.
pub fn choose_input_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> Result<(StreamConfig, SampleFormat), AudioError> {
    let ranges: Vec<SupportedStreamConfigRange> = device
        .supported_input_configs()
        .map_err(|e| AudioError::CpalError(e.to_string()))?
        .collect();

    let rate = SampleRate(sample_rate);
    let best = ranges
        .into_iter()
        .filter(|r| rate >= r.min_sample_rate() && rate <= r.max_sample_rate())
        .filter(|r| matches!(r.sample_format(), SampleFormat::I16 | SampleFormat::F32))
        .min_by_key(|r| rank(r.channels(), r.sample_format()))
        .ok_or_else(|| {
            AudioError::UnsupportedFormat(format!(
                "no i16/f32 input configuration at {sample_rate} Hz"
            ))
        })?;

    let format = best.sample_format();
    Ok((best.with_sample_rate(rate).config(), format))
}

fn rank(channels: u16, format: SampleFormat) -> (bool, u16, bool) {
    (channels != 1, channels, format != SampleFormat::I16)
}
