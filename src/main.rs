use anyhow::Context;
use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use edgecam::config::Config;
use edgecam::device::Device;
use edgecam::frame::Camera;
use edgecam::links::LoopbackLink;
use edgecam::logging::{LogFormat, LogLevel, init_logging};
use edgecam::sources::DirectorySource;
use edgecam::status::LogPublisher;

#[derive(Parser, Debug)]
#[command(name = "edgecam", version, about = "Edge camera link supervisor and MJPEG server")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, short, value_name = "PATH", env = "EDGECAM_CONFIG")]
    config: PathBuf,

    /// Directory of JPEG files served as camera frames.
    #[arg(long, value_name = "DIR", default_value = "frames")]
    frames: PathBuf,

    /// Frame buffer slots the source can lend out at once.
    #[arg(long, value_name = "N", default_value_t = DirectorySource::DEFAULT_SLOTS)]
    slots: usize,

    /// Address reported by the simulated link.
    #[arg(long, value_name = "IP", default_value = "192.168.4.2")]
    address: Ipv4Addr,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    let camera = Camera::from_init(DirectorySource::open(&cli.frames, cli.slots));
    let device = Device::new(
        config.clone(),
        LoopbackLink::new(cli.address),
        camera,
        LogPublisher::new(config.broker_uri()),
    );

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, stopping"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        signal.cancel();
    });

    let summary = device.run(cancel).await?;
    info!(services_started = summary.services_started, "Device stopped");
    Ok(())
}
