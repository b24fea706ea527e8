//! Sender configuration
//!
//! All sections implement `Serialize`, `Deserialize` and `Default` so a
//! partial `sender.toml` only needs the keys it overrides:
//!
//! ```toml
//! [network]
//! destination = "192.168.1.20"
//! rtp_port = 5004
//!
//! [stream]
//! report_interval = 50
//! rtcp_send = { retries = 2, on_failure = "skip" }
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;
use crate::network::SendPolicy;

/// Where packets go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Receiver address
    pub destination: IpAddr,
    /// RTP port on the receiver (even by convention)
    pub rtp_port: u16,
    /// RTCP port on the receiver; `None` means `rtp_port + 1`
    pub rtcp_port: Option<u16>,
    /// Local address both sockets bind to
    pub bind_address: IpAddr,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            destination: IpAddr::V4(Ipv4Addr::LOCALHOST),
            rtp_port: DEFAULT_RTP_PORT,
            rtcp_port: None,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl NetworkConfig {
    pub fn rtp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.destination, self.rtp_port)
    }

    pub fn rtcp_addr(&self) -> SocketAddr {
        let port = self.rtcp_port.unwrap_or(self.rtp_port.wrapping_add(1));
        SocketAddr::new(self.destination, port)
    }

    /// Override the destination from `host` or `host:port`.
    ///
    /// Hostnames are resolved once, here; the stream never re-resolves.
    pub fn set_destination(&mut self, target: &str) -> Result<(), ConfigError> {
        if let Ok(addr) = target.parse::<SocketAddr>() {
            self.destination = addr.ip();
            self.rtp_port = addr.port();
            return Ok(());
        }
        if let Ok(ip) = target.parse::<IpAddr>() {
            self.destination = ip;
            return Ok(());
        }

        let (host, port) = match target.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ConfigError::Destination(target.to_string()))?;
                (host, port)
            }
            None => (target, self.rtp_port),
        };
        let resolved = (host, port)
            .to_socket_addrs()
            .map_err(|_| ConfigError::Destination(target.to_string()))?
            .next()
            .ok_or_else(|| ConfigError::Destination(target.to_string()))?;

        self.destination = resolved.ip();
        self.rtp_port = resolved.port();
        Ok(())
    }
}

/// Capture device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name; `None` means the system default
    pub device: Option<String>,
    /// Capture rate in Hz (also the RTP clock rate)
    pub sample_rate: u32,
    /// How long a read may wait for a full block before returning short
    pub read_timeout_ms: u64,
    /// Ring buffer size, in blocks, between the device thread and the stream
    pub ring_capacity_blocks: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            ring_capacity_blocks: DEFAULT_RING_CAPACITY_BLOCKS,
        }
    }
}

/// Session and scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Samples per packet (one octet each after encoding)
    pub payload_size: usize,
    /// Fixed SSRC; random when unset
    pub ssrc: Option<u32>,
    /// First sequence number; random when unset
    pub initial_sequence: Option<u16>,
    /// Send a Sender Report every this many packets
    pub report_interval: u32,
    /// Log a stats summary every this many packets (0 disables)
    pub stats_log_interval: u32,
    /// What to do when an RTP send fails
    pub rtp_send: SendPolicy,
    /// What to do when an RTCP send fails
    pub rtcp_send: SendPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            payload_size: DEFAULT_PAYLOAD_SIZE,
            ssrc: None,
            initial_sequence: None,
            report_interval: DEFAULT_REPORT_INTERVAL,
            stats_log_interval: DEFAULT_STATS_LOG_INTERVAL,
            rtp_send: SendPolicy::default(),
            rtcp_send: SendPolicy::default(),
        }
    }
}

/// Top-level configuration, serialised as `sender.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub audio: AudioConfig,
    pub stream: StreamConfig,
}

impl AppConfig {
    const FILE_NAME: &'static str = "sender.toml";

    /// Platform config file location, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ulaw-rtp-sender")
            .map(|dirs| dirs.config_dir().join(Self::FILE_NAME))
    }

    /// Load from the platform config file, or defaults if there is none
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Save to an explicit path, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    /// Reject settings the stream cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };

        if self.audio.sample_rate == 0 {
            return invalid("audio.sample_rate", "must be non-zero");
        }
        if self.audio.read_timeout_ms == 0 {
            return invalid("audio.read_timeout_ms", "must be non-zero");
        }
        if self.audio.ring_capacity_blocks == 0 {
            return invalid("audio.ring_capacity_blocks", "must be non-zero");
        }
        if self.stream.payload_size == 0 {
            return invalid("stream.payload_size", "must be non-zero");
        }
        if self.stream.payload_size > MAX_PAYLOAD_SIZE {
            return Err(ConfigError::Invalid {
                field: "stream.payload_size",
                reason: format!("must not exceed {MAX_PAYLOAD_SIZE} octets"),
            });
        }
        if self.stream.report_interval == 0 {
            return invalid("stream.report_interval", "must be non-zero");
        }
        if self.network.rtp_port == 0 {
            return invalid("network.rtp_port", "must be non-zero");
        }
        if self.network.rtp_port == u16::MAX && self.network.rtcp_port.is_none() {
            return invalid("network.rtcp_port", "required when rtp_port is 65535");
        }
        Ok(())
    }

    /// Nominal real-time duration of one packet
    pub fn frame_duration(&self) -> Duration {
        Duration::from_nanos(
            self.stream.payload_size as u64 * 1_000_000_000 / u64::from(self.audio.sample_rate.max(1)),
        )
    }
}
