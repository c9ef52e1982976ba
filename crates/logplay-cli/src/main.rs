//! logplay: replay an event log in real time.
//!
//! Records are paced against wall-clock time and handed to the publish
//! sink; playback can be steered over the loopback remote-control socket
//! while it runs. Ctrl-C saves channel preferences and exits.

use anyhow::{ensure, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use logplay_core::config::PlayerConfig;
use logplay_core::feedback::TracingObserver;
use logplay_core::player::LogPlayer;
use logplay_core::sink::TracingSink;

/// Event log playback tool with random access, speed control and channel
/// suppression/remapping.
#[derive(Parser, Debug)]
#[command(name = "logplay", version, about)]
struct Args {
    /// Log file to play
    log: PathBuf,

    /// Start with the log paused
    #[arg(short, long)]
    paused: bool,

    /// Disable channels matching this regex
    #[arg(short, long, value_name = "REGEX")]
    filter: Option<String>,

    /// Invert the filter: only channels matching it are enabled
    #[arg(short = 'v', long)]
    invert_filter: bool,

    /// JSON configuration file (defaults to the per-user config)
    #[arg(short, long, env = "LOGPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// UDP port for the loopback remote control
    #[arg(long)]
    remote_port: Option<u16>,

    /// Do not start the remote-control listener
    #[arg(long)]
    no_remote: bool,

    /// Initial index into the speed table (4 = 1.0x)
    #[arg(long)]
    speed_index: Option<usize>,

    /// Channel prefix for remote STEP commands
    #[arg(long)]
    step_prefix: Option<String>,

    /// Report absolute timestamps instead of log-relative ones
    #[arg(long)]
    absolute_time: bool,
}

impl Args {
    fn apply(&self, config: &mut PlayerConfig) {
        if let Some(filter) = &self.filter {
            config.channel_filter = Some(filter.clone());
        }
        if self.invert_filter {
            config.invert_channel_filter = true;
        }
        if let Some(port) = self.remote_port {
            config.remote.bind.set_port(port);
        }
        if self.no_remote {
            config.remote.enabled = false;
        }
        if let Some(index) = self.speed_index {
            config.initial_speed_index = index;
        }
        if let Some(prefix) = &self.step_prefix {
            config.step_prefix = prefix.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    ensure!(args.log.is_file(), "log file not found: {}", args.log.display());

    let mut config = match &args.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::load_default()?,
    };
    args.apply(&mut config);

    let observer = Arc::new(TracingObserver {
        absolute_time: args.absolute_time,
    });
    let player = LogPlayer::new(config, Arc::new(TracingSink), observer)
        .context("failed to start player")?;
    player.open(&args.log, !args.paused);

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for Ctrl-C")?;
    tracing::info!("Shutting down");

    tokio::task::spawn_blocking(move || player.close())
        .await
        .context("shutdown task failed")?
        .context("failed to close log")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "logplay",
            "run.log",
            "-p",
            "-f",
            "CAM.*",
            "-v",
            "--remote-port",
            "6000",
            "--speed-index",
            "6",
        ]);
        assert!(args.paused);

        let mut config = PlayerConfig::default();
        args.apply(&mut config);
        assert_eq!(config.channel_filter.as_deref(), Some("CAM.*"));
        assert!(config.invert_channel_filter);
        assert_eq!(config.remote.bind.port(), 6000);
        assert!(config.remote.enabled);
        assert_eq!(config.initial_speed_index, 6);
    }

    #[test]
    fn test_no_remote() {
        let args = Args::parse_from(["logplay", "run.log", "--no-remote"]);
        let mut config = PlayerConfig::default();
        args.apply(&mut config);
        assert!(!config.remote.enabled);
    }
}
