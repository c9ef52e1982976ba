//! Remote control
//!
//! Accepts newline-terminated ASCII commands, one per UDP datagram, on a
//! loopback socket and turns them into player events:
//!
//! | command           | effect                                  |
//! |-------------------|-----------------------------------------|
//! | `PLAYPAUSETOGGLE` | toggle play/pause                       |
//! | `PLAY` / `PAUSE`  | set play state                          |
//! | `STEP`            | step to the next record on the step prefix |
//! | `FASTER`/`SLOWER` | move one entry along the speed table    |
//! | `BACK<s>`         | seek `s` seconds backwards              |
//! | `FORWARD<s>`      | seek `s` seconds forwards               |
//!
//! Speed changes are applied directly; they do not touch playback state
//! that the command thread owns.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::error::PlayerError;
use crate::player::{EventSender, LogHandle, PlayerEvent, SpeedControl};

/// Largest datagram accepted
const MAX_DATAGRAM: usize = 1024;

/// How often the listener checks for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors parsing a remote command
#[derive(Error, Debug, PartialEq)]
pub enum RemoteCommandError {
    /// Not a known command
    #[error("Unknown remote command: {0}")]
    Unknown(String),

    /// `BACK`/`FORWARD` without a valid number
    #[error("Invalid seconds in remote command: {0}")]
    InvalidSeconds(String),
}

/// A parsed remote-control command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    /// `PLAYPAUSETOGGLE`
    PlayPauseToggle,
    /// `PLAY`
    Play,
    /// `PAUSE`
    Pause,
    /// `STEP`
    Step,
    /// `FASTER`
    Faster,
    /// `SLOWER`
    Slower,
    /// `BACK<s>`: seconds to rewind
    Back(f64),
    /// `FORWARD<s>`: seconds to skip
    Forward(f64),
}

impl FromStr for RemoteCommand {
    type Err = RemoteCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cmd = s.trim();
        let seconds = |arg: &str| {
            arg.trim()
                .parse::<f64>()
                .map_err(|_| RemoteCommandError::InvalidSeconds(cmd.to_string()))
        };

        match cmd {
            "PLAYPAUSETOGGLE" => Ok(RemoteCommand::PlayPauseToggle),
            "PLAY" => Ok(RemoteCommand::Play),
            "PAUSE" => Ok(RemoteCommand::Pause),
            "STEP" => Ok(RemoteCommand::Step),
            "FASTER" => Ok(RemoteCommand::Faster),
            "SLOWER" => Ok(RemoteCommand::Slower),
            _ => {
                if let Some(arg) = cmd.strip_prefix("BACK") {
                    Ok(RemoteCommand::Back(seconds(arg)?))
                } else if let Some(arg) = cmd.strip_prefix("FORWARD") {
                    Ok(RemoteCommand::Forward(seconds(arg)?))
                } else {
                    Err(RemoteCommandError::Unknown(cmd.to_string()))
                }
            }
        }
    }
}

/// Translates remote commands into player actions
#[derive(Clone)]
pub struct RemoteBridge {
    sender: EventSender,
    speed: Arc<SpeedControl>,
    log: Arc<LogHandle>,
    step_prefix: String,
}

impl RemoteBridge {
    /// Bridge feeding `sender`; relative seeks use `log` for position and duration
    pub fn new(
        sender: EventSender,
        speed: Arc<SpeedControl>,
        log: Arc<LogHandle>,
        step_prefix: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            speed,
            log,
            step_prefix: step_prefix.into(),
        }
    }

    /// Handle one raw datagram. Bad commands are logged and ignored.
    pub fn handle_datagram(&self, data: &[u8]) {
        let text = String::from_utf8_lossy(data);
        match text.parse::<RemoteCommand>() {
            Ok(cmd) => {
                if let Err(e) = self.apply(cmd) {
                    tracing::warn!(?cmd, error = %e, "Remote command ignored");
                }
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    /// Carry out a parsed command
    pub fn apply(&self, cmd: RemoteCommand) -> Result<(), PlayerError> {
        tracing::debug!(?cmd, "Remote command");
        match cmd {
            RemoteCommand::PlayPauseToggle => self.sender.submit(PlayerEvent::PlayPauseToggle),
            RemoteCommand::Play => self.sender.submit(PlayerEvent::PlayPauseSet(true)),
            RemoteCommand::Pause => self.sender.submit(PlayerEvent::PlayPauseSet(false)),
            RemoteCommand::Step => {
                self.sender.submit(PlayerEvent::Step(self.step_prefix.clone()))
            }
            RemoteCommand::Faster => {
                self.speed.faster();
            }
            RemoteCommand::Slower => {
                self.speed.slower();
            }
            RemoteCommand::Back(seconds) => self.seek_by(-seconds)?,
            RemoteCommand::Forward(seconds) => self.seek_by(seconds)?,
        }
        Ok(())
    }

    fn seek_by(&self, seconds: f64) -> Result<(), PlayerError> {
        let Some(total) = self.log.info().total_seconds else {
            tracing::warn!(seconds, "Log duration unknown; relative seek ignored");
            return Ok(());
        };
        let position = self.log.position_fraction()?;
        self.sender
            .submit(PlayerEvent::Seek(position + seconds / total));
        Ok(())
    }
}

/// Background UDP listener feeding a [`RemoteBridge`]
pub struct RemoteControl {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RemoteControl {
    /// Bind `addr` and start listening
    pub fn spawn(addr: SocketAddr, bridge: RemoteBridge) -> Result<Self, PlayerError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let local_addr = socket.local_addr()?;
        let shutdown = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&shutdown);
        let worker = thread::Builder::new()
            .name("logplay-remote".into())
            .spawn(move || listen(socket, bridge, flag))
            .map_err(|source| PlayerError::Spawn {
                name: "remote control",
                source,
            })?;

        tracing::info!(addr = %local_addr, "Remote control listening");
        Ok(Self {
            local_addr,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the listener thread
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for RemoteControl {
    fn drop(&mut self) {
        self.stop();
    }
}

fn listen(socket: UdpSocket, bridge: RemoteBridge, shutdown: Arc<AtomicBool>) {
    let mut buf = [0u8; MAX_DATAGRAM];
    while !shutdown.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((len, _from)) => bridge.handle_datagram(&buf[..len]),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) => tracing::warn!(error = %e, "Remote control receive failed"),
        }
    }
    tracing::debug!("Remote control stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("PLAYPAUSETOGGLE\n".parse(), Ok(RemoteCommand::PlayPauseToggle));
        assert_eq!("PLAY".parse(), Ok(RemoteCommand::Play));
        assert_eq!("PAUSE".parse(), Ok(RemoteCommand::Pause));
        assert_eq!(" STEP ".parse(), Ok(RemoteCommand::Step));
        assert_eq!("FASTER".parse(), Ok(RemoteCommand::Faster));
        assert_eq!("SLOWER".parse(), Ok(RemoteCommand::Slower));
        assert_eq!("BACK5".parse(), Ok(RemoteCommand::Back(5.0)));
        assert_eq!("FORWARD 2.5\n".parse(), Ok(RemoteCommand::Forward(2.5)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "REWIND".parse::<RemoteCommand>(),
            Err(RemoteCommandError::Unknown("REWIND".into()))
        );
        assert_eq!(
            "BACKx".parse::<RemoteCommand>(),
            Err(RemoteCommandError::InvalidSeconds("BACKx".into()))
        );
        assert!("play".parse::<RemoteCommand>().is_err());
    }
}
