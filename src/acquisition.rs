//! The background feed loop: receive a datagram, decode it, fold it into
//! the calibration state, publish the normalized sample, repeat.
//!
//! The loop owns its socket and its [`Calibrator`] for the whole session.
//! Cancellation is cooperative: the host raises a shared flag and the loop
//! notices it within one receive-timeout window, because every receive is
//! bounded by [`DeviceConfig::recv_timeout`](crate::config::DeviceConfig).

use crate::calibration::Calibrator;
use crate::clock::Clock;
use crate::frame;
use crate::session_log::SampleSink;
use crate::store::SampleStore;

use log::{debug, error, warn};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Receive buffer size; generous for a frame of a few dozen ASCII floats.
pub const MAX_DATAGRAM: usize = 1024;

/// Creates and binds the receiving socket. Address-reuse options are
/// best-effort (a refusal is just a warning); a failed bind is fatal to
/// initialization. The returned socket already has its bounded-wait
/// receive timeout installed.
pub fn bind_socket(addr: SocketAddr, recv_timeout: Duration) -> io::Result<UdpSocket> {
    let socket = bind_with_reuse(addr)?;
    socket.set_read_timeout(Some(recv_timeout))?;
    Ok(socket)
}

/// On unix, IPv4 sockets are created through libc so SO_REUSEADDR can be
/// applied before the bind, matching how acquisition rigs are usually
/// restarted in place.
#[cfg(unix)]
fn bind_with_reuse(addr: SocketAddr) -> io::Result<UdpSocket> {
    use std::os::fd::FromRawFd;

    let SocketAddr::V4(v4) = addr else {
        debug!("address reuse not attempted for non-IPv4 bind address");
        return UdpSocket::bind(addr);
    };

    // SAFETY: plain socket(2)/setsockopt(2)/bind(2) calls; the raw fd is
    // either wrapped into a UdpSocket or closed before returning.
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let one: libc::c_int = 1;
        let rc = libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &one as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        if rc != 0 {
            warn!(
                "could not set SO_REUSEADDR: {} (continuing without it)",
                io::Error::last_os_error()
            );
        }

        let mut sin: libc::sockaddr_in = std::mem::zeroed();
        sin.sin_family = libc::AF_INET as libc::sa_family_t;
        sin.sin_port = v4.port().to_be();
        sin.sin_addr.s_addr = u32::from_ne_bytes(v4.ip().octets());

        let rc = libc::bind(
            fd,
            &sin as *const libc::sockaddr_in as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if rc != 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        Ok(UdpSocket::from_raw_fd(fd))
    }
}

#[cfg(not(unix))]
fn bind_with_reuse(addr: SocketAddr) -> io::Result<UdpSocket> {
    debug!("address reuse not available on this platform");
    UdpSocket::bind(addr)
}

fn is_timeout(err: &io::Error) -> bool {
    // WouldBlock on unix, TimedOut on windows
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Starts the feed thread and returns its handle.
///
/// The thread runs until `running` goes false or the socket fails for a
/// reason other than its receive timeout. The calibrator travels into the
/// thread and comes back out through the handle, so the final maxima can
/// only be read once the loop has truly stopped.
pub fn spawn_feed(
    socket: UdpSocket,
    store: SampleStore,
    mut calibrator: Calibrator,
    clock: Box<dyn Clock>,
    mut sink: Option<Box<dyn SampleSink>>,
    running: Arc<AtomicBool>,
) -> JoinHandle<Calibrator> {
    thread::spawn(move || {
        let n_channels = calibrator.len();
        let mut buf = [0u8; MAX_DATAGRAM];

        while running.load(Ordering::Relaxed) {
            // Stamp before waiting so the sample carries its arrival
            // window, not the time decoding finished.
            let stamp = clock.now();

            match socket.recv_from(&mut buf) {
                Ok((len, src)) => {
                    let raw = match frame::decode_frame(&buf[..len], n_channels) {
                        Ok(raw) => raw,
                        Err(err) => {
                            warn!("malformed datagram from {}: {}", src, err);
                            vec![0.0; n_channels]
                        }
                    };

                    let normalized = calibrator.process(&raw);
                    store.publish(normalized.clone(), stamp);

                    if let Some(sink) = sink.as_mut() {
                        if let Err(err) = sink.append(stamp, &normalized) {
                            warn!("could not record sample: {}", err);
                        }
                    }
                }
                Err(err) if is_timeout(&err) => {
                    // No traffic inside the wait window; go around and
                    // recheck the stop flag.
                }
                Err(err) => {
                    if running.load(Ordering::Relaxed) {
                        error!("receive failed, feed loop terminating: {}", err);
                    } else {
                        debug!("receive interrupted by stop request");
                    }
                    break;
                }
            }
        }

        if let Some(sink) = sink.as_mut() {
            if let Err(err) = sink.finish() {
                warn!("could not close sample recording: {}", err);
            }
        }

        calibrator
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SessionClock;
    use std::sync::Mutex;
    use std::time::Instant;

    fn loopback_pair() -> (UdpSocket, UdpSocket) {
        let receiver = bind_socket(
            "127.0.0.1:0".parse().unwrap(),
            Duration::from_millis(50),
        )
        .unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.connect(receiver.local_addr().unwrap()).unwrap();
        (receiver, sender)
    }

    /// Polls the store until a fresh sample shows up or a second passes.
    fn wait_for_sample(store: &SampleStore) -> Option<Vec<f64>> {
        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            if let Some(values) = store.consume() {
                return Some(values);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    struct CollectingSink(Arc<Mutex<Vec<(f64, Vec<f64>)>>>);

    impl SampleSink for CollectingSink {
        fn append(
            &mut self,
            time: f64,
            values: &[f64],
        ) -> Result<(), crate::session_log::SessionLogError> {
            self.0.lock().unwrap().push((time, values.to_vec()));
            Ok(())
        }

        fn finish(&mut self) -> Result<(), crate::session_log::SessionLogError> {
            Ok(())
        }
    }

    #[test]
    fn bind_socket_installs_timeout() {
        let socket = bind_socket(
            "127.0.0.1:0".parse().unwrap(),
            Duration::from_millis(20),
        )
        .unwrap();
        assert_eq!(
            socket.read_timeout().unwrap(),
            Some(Duration::from_millis(20))
        );

        let mut buf = [0u8; 16];
        let started = Instant::now();
        let err = socket.recv_from(&mut buf).unwrap_err();
        assert!(is_timeout(&err));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn receives_normalizes_and_publishes() {
        let (receiver, sender) = loopback_pair();
        let store = SampleStore::new(2);
        let running = Arc::new(AtomicBool::new(true));

        let handle = spawn_feed(
            receiver,
            store.clone(),
            Calibrator::new(2, None),
            Box::new(SessionClock::new()),
            None,
            running.clone(),
        );

        sender.send(b"[2.0,\"4.0\"]").unwrap();
        assert_eq!(wait_for_sample(&store), Some(vec![1.0, 1.0]));

        sender.send(b"[1.0,2.0]").unwrap();
        assert_eq!(wait_for_sample(&store), Some(vec![0.5, 0.5]));

        running.store(false, Ordering::Relaxed);
        let calibrator = handle.join().unwrap();
        assert_eq!(calibrator.max_amplitudes(), &[2.0, 4.0]);
    }

    #[test]
    fn malformed_datagram_does_not_stall_the_loop() {
        let (receiver, sender) = loopback_pair();
        let store = SampleStore::new(2);
        let running = Arc::new(AtomicBool::new(true));

        let handle = spawn_feed(
            receiver,
            store.clone(),
            Calibrator::new(2, None),
            Box::new(SessionClock::new()),
            None,
            running.clone(),
        );

        // Missing opening bracket: zeroed iteration, loop keeps going.
        sender.send(b"2.0,4.0]").unwrap();
        assert_eq!(wait_for_sample(&store), Some(vec![0.0, 0.0]));

        sender.send(b"[3.0,6.0]").unwrap();
        assert_eq!(wait_for_sample(&store), Some(vec![1.0, 1.0]));

        running.store(false, Ordering::Relaxed);
        let calibrator = handle.join().unwrap();
        // The bad packet left the maxima alone.
        assert_eq!(calibrator.max_amplitudes(), &[3.0, 6.0]);
    }

    #[test]
    fn stop_while_idle_exits_within_the_timeout_window() {
        let (receiver, _sender) = loopback_pair();
        let store = SampleStore::new(1);
        let running = Arc::new(AtomicBool::new(true));

        let handle = spawn_feed(
            receiver,
            store,
            Calibrator::new(1, None),
            Box::new(SessionClock::new()),
            None,
            running.clone(),
        );

        thread::sleep(Duration::from_millis(10));
        let stopped_at = Instant::now();
        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();
        // One 50 ms receive window plus scheduling slack.
        assert!(stopped_at.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn recording_sink_sees_every_published_sample() {
        let (receiver, sender) = loopback_pair();
        let store = SampleStore::new(2);
        let running = Arc::new(AtomicBool::new(true));
        let recorded = Arc::new(Mutex::new(Vec::new()));

        let handle = spawn_feed(
            receiver,
            store.clone(),
            Calibrator::new(2, None),
            Box::new(SessionClock::new()),
            Some(Box::new(CollectingSink(recorded.clone()))),
            running.clone(),
        );

        sender.send(b"[2.0,4.0]").unwrap();
        assert!(wait_for_sample(&store).is_some());
        sender.send(b"[1.0,2.0]").unwrap();
        assert!(wait_for_sample(&store).is_some());

        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();

        let rows = recorded.lock().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, vec![1.0, 1.0]);
        assert_eq!(rows[1].1, vec![0.5, 0.5]);
        assert!(rows[1].0 >= rows[0].0);
    }
}
