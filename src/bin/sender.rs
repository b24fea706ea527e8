//! µ-law RTP Sender Application
//!
//! Captures audio from an input device and streams it as PCMU over RTP, with
//! RTCP Sender Reports on the companion port.
//!
//! ```text
//! sender [DEST_HOST[:PORT]] [--config PATH]
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ulaw_rtp_sender::{
    audio::{list_input_devices, CaptureSource},
    config::AppConfig,
    error::{ConfigError, Error},
    network::UdpChannel,
    stream::Streamer,
};

#[derive(Debug, Default)]
struct Args {
    destination: Option<String>,
    config_path: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, ConfigError> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or(ConfigError::Invalid {
                    field: "--config",
                    reason: "expects a path".to_string(),
                })?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') => {
                return Err(ConfigError::Invalid {
                    field: "arguments",
                    reason: format!("unknown option '{flag}'"),
                });
            }
            _ if parsed.destination.is_none() => parsed.destination = Some(arg),
            _ => {
                return Err(ConfigError::Invalid {
                    field: "arguments",
                    reason: format!("unexpected argument '{arg}'"),
                });
            }
        }
    }
    Ok(parsed)
}

fn load_config(args: &Args) -> Result<AppConfig, ConfigError> {
    let mut config = match &args.config_path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(dest) = &args.destination {
        config.network.set_destination(dest)?;
    }
    config.validate()?;
    Ok(config)
}

async fn run() -> Result<()> {
    let args = parse_args(std::env::args().skip(1)).map_err(Error::from)?;
    let config = load_config(&args).map_err(Error::from)?;

    let rtp_addr = config.network.rtp_addr();
    let rtcp_addr = config.network.rtcp_addr();
    tracing::info!("Target receiver: RTP {} / RTCP {}", rtp_addr, rtcp_addr);

    let devices = list_input_devices();
    tracing::debug!("Available input devices: {:?}", devices);

    let source = CaptureSource::open(&config.audio, config.stream.payload_size).map_err(Error::from)?;
    tracing::info!(
        "Audio capture started: {} Hz mono, {} samples/packet ({:?})",
        config.audio.sample_rate,
        config.stream.payload_size,
        config.frame_duration()
    );

    let rtp = UdpChannel::open(config.network.bind_address, rtp_addr).map_err(Error::from)?;
    let rtcp = UdpChannel::open(config.network.bind_address, rtcp_addr).map_err(Error::from)?;
    if let Ok(local) = rtp.local_addr() {
        tracing::info!("RTP socket bound to {}", local);
    }

    let mut streamer = Streamer::new(source, rtp, rtcp, &config);

    tracing::info!("Starting main loop - press Ctrl+C to stop");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let stats = streamer.run(shutdown).await?;

    tracing::info!(
        "Stopped after {} iterations: {} packets, {} octets, {} reports, {} captured samples, ring {:.0}% full",
        stats.iterations,
        streamer.session().packet_count(),
        streamer.session().octet_count(),
        stats.reports_sent,
        streamer.source().samples_captured(),
        streamer.source().ring_fill_level() * 100.0
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting µ-law RTP sender");

    if let Err(err) = run().await.context("sender failed") {
        tracing::error!("{:#}", err);
        let code = err.downcast_ref::<Error>().map_or(1, Error::exit_code);
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_destination_and_config() {
        let parsed = parse_args(args(&["10.0.0.2:6000", "--config", "/tmp/s.toml"])).unwrap();
        assert_eq!(parsed.destination.as_deref(), Some("10.0.0.2:6000"));
        assert_eq!(parsed.config_path, Some(PathBuf::from("/tmp/s.toml")));
    }

    #[test]
    fn test_parse_rejects_unknown_flag() {
        assert!(parse_args(args(&["--verbose"])).is_err());
        assert!(parse_args(args(&["--config"])).is_err());
        assert!(parse_args(args(&["a", "b"])).is_err());
    }

    #[test]
    fn test_load_config_applies_destination() {
        let parsed = Args {
            destination: Some("192.168.1.9:7000".into()),
            config_path: Some(PathBuf::from("/nonexistent/sender.toml")),
        };
        let config = load_config(&parsed).unwrap();
        assert_eq!(config.network.rtp_addr(), "192.168.1.9:7000".parse().unwrap());
        assert_eq!(config.network.rtcp_addr(), "192.168.1.9:7001".parse().unwrap());
    }
}
