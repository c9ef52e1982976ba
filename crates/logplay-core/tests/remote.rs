//! Remote control over the loopback UDP socket

#[cfg(test)]
mod tests {
    use logplay_core::config::PlayerConfig;
    use logplay_core::feedback::NullObserver;
    use logplay_core::log::{MemoryLog, Record};
    use logplay_core::player::LogPlayer;
    use logplay_core::sink::TracingSink;
    use std::io;
    use std::net::{SocketAddr, UdpSocket};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn start(published: Arc<AtomicUsize>) -> LogPlayer {
        let mut config = PlayerConfig::default();
        config.remote.bind = "127.0.0.1:0".parse().unwrap();
        config.step_prefix = "GPS".to_string();

        // 10 s of log, a GPS fix every fifth record
        let log = MemoryLog::new(
            (0..100)
                .map(|i| {
                    let channel = if i % 5 == 4 { "GPS" } else { "IMU" };
                    Record::new(i, i * 100_000, channel, vec![0])
                })
                .collect(),
        );
        let sink = move |_: &str, _: &[u8]| -> io::Result<()> {
            published.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        LogPlayer::with_log(config, Box::new(log), Arc::new(sink), Arc::new(NullObserver)).unwrap()
    }

    fn send(addr: SocketAddr, command: &str) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(command.as_bytes(), addr).unwrap();
    }

    fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_speed_commands() {
        let player = start(Arc::new(AtomicUsize::new(0)));
        let addr = player.remote_addr().unwrap();
        assert_eq!(player.speed().index(), 4);

        send(addr, "FASTER\n");
        assert!(eventually(|| player.speed().index() == 5));
        send(addr, "SLOWER\n");
        send(addr, "SLOWER\n");
        assert!(eventually(|| player.speed().index() == 3));

        // Garbage is ignored and the listener keeps going
        send(addr, "REWIND\n");
        send(addr, "FASTER\n");
        assert!(eventually(|| player.speed().index() == 4));
        player.close().unwrap();
    }

    #[test]
    fn test_play_pause_commands() {
        let player = start(Arc::new(AtomicUsize::new(0)));
        let addr = player.remote_addr().unwrap();

        send(addr, "PLAY\n");
        assert!(eventually(|| player.is_playing()));
        send(addr, "PAUSE\n");
        assert!(eventually(|| !player.is_playing()));
        send(addr, "PLAYPAUSETOGGLE\n");
        assert!(eventually(|| player.is_playing()));
        player.close().unwrap();
    }

    #[test]
    fn test_relative_seek_commands() {
        let player = start(Arc::new(AtomicUsize::new(0)));
        let addr = player.remote_addr().unwrap();

        send(addr, "FORWARD5\n");
        assert!(eventually(|| player.log().position_fraction().unwrap() == 0.5));
        send(addr, "BACK2.5\n");
        assert!(eventually(|| player.log().position_fraction().unwrap() == 0.25));
        send(addr, "BACK60\n");
        assert!(eventually(|| player.log().position_fraction().unwrap() == 0.0));
        player.close().unwrap();
    }

    #[test]
    fn test_step_command_uses_step_prefix() {
        let published = Arc::new(AtomicUsize::new(0));
        let player = start(published.clone());
        let addr = player.remote_addr().unwrap();

        send(addr, "STEP\n");
        assert!(eventually(|| published.load(Ordering::SeqCst) == 5 && !player.is_playing()));
        send(addr, "STEP\n");
        assert!(eventually(|| published.load(Ordering::SeqCst) == 10 && !player.is_playing()));
        player.close().unwrap();
    }

    #[test]
    fn test_port_in_use_leaves_remote_disabled() {
        let holder = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut config = PlayerConfig::default();
        config.remote.bind = holder.local_addr().unwrap();

        let player = LogPlayer::new(config, Arc::new(TracingSink), Arc::new(NullObserver)).unwrap();
        assert_eq!(player.remote_addr(), None);
        player.close().unwrap();
    }
}
