//! Error types for the RTP sender

use std::net::SocketAddr;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error class.
    ///
    /// | Code | Class                         |
    /// |------|-------------------------------|
    /// | 2    | configuration                 |
    /// | 3    | audio device open / configure |
    /// | 4    | socket setup                  |
    /// | 5    | RTP send                      |
    /// | 6    | RTCP send                     |
    /// | 1    | anything else                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::Audio(_) => 3,
            Error::Network(NetworkError::SendFailed { channel: Channel::Rtp, .. }) => 5,
            Error::Network(NetworkError::SendFailed { channel: Channel::Rtcp, .. }) => 6,
            Error::Network(_) => 4,
            Error::Io(_) => 1,
        }
    }
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("cpal error: {0}")]
    CpalError(String),
}

/// Which of the two datagram channels an operation concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Media packets
    Rtp,
    /// Sender reports
    Rtcp,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Rtp => f.write_str("RTP"),
            Channel::Rtcp => f.write_str("RTCP"),
        }
    }
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket creation failed: {0}")]
    SocketFailed(#[source] std::io::Error),

    #[error("Socket bind to {addr} failed: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("{channel} send to {dest} failed after {attempts} attempt(s): {source}")]
    SendFailed {
        channel: Channel,
        dest: SocketAddr,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Invalid destination address: {0}")]
    Destination(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused")
    }

    #[test]
    fn test_exit_codes_distinguish_fatal_classes() {
        let dest: SocketAddr = "127.0.0.1:5004".parse().unwrap();

        let config = Error::from(ConfigError::Invalid { field: "sample_rate", reason: "zero".into() });
        let audio = Error::from(AudioError::DeviceNotFound("hw:9".into()));
        let setup = Error::from(NetworkError::SocketFailed(io_err()));
        let rtp = Error::from(NetworkError::SendFailed {
            channel: Channel::Rtp,
            dest,
            attempts: 1,
            source: io_err(),
        });
        let rtcp = Error::from(NetworkError::SendFailed {
            channel: Channel::Rtcp,
            dest,
            attempts: 3,
            source: io_err(),
        });

        assert_eq!(config.exit_code(), 2);
        assert_eq!(audio.exit_code(), 3);
        assert_eq!(setup.exit_code(), 4);
        assert_eq!(rtp.exit_code(), 5);
        assert_eq!(rtcp.exit_code(), 6);
    }

    #[test]
    fn test_send_failure_message() {
        let err = NetworkError::SendFailed {
            channel: Channel::Rtcp,
            dest: "10.0.0.2:5005".parse().unwrap(),
            attempts: 2,
            source: io_err(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("RTCP send to 10.0.0.2:5005 failed after 2 attempt(s)"));
    }
}
