//! Audio subsystem module

pub mod buffer;
pub mod capture;
pub mod device;
pub mod source;

pub use buffer::{create_shared_ring, SampleRing, SharedSampleRing};
pub use capture::AudioCapture;
pub use device::{find_input_device, list_input_devices};
pub use source::{AudioSource, CaptureSource, ReadError, RingReader};
