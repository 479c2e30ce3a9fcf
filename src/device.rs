//! Lifecycle of the UDP acquisition device: validate configuration, start
//! the feed thread, hand samples to the consumer, and put the calibration
//! maxima back where they came from on stop.

use crate::acquisition;
use crate::calibration::Calibrator;
use crate::channels::{ChannelSet, ChannelSetError};
use crate::clock::SessionClock;
use crate::config::{ConfigError, DeviceConfig};
use crate::producer::SampleProducer;
use crate::session_log::SampleSink;
use crate::store::SampleStore;

use log::{error, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A fatal initialization failure. Everything here is raised before the
/// feed thread exists; per-packet trouble after start never surfaces this
/// way (consumer reads just degrade to zeros).
#[derive(Debug)]
pub enum DeviceError {
    /// The channel list was empty or carried duplicates.
    Channels(ChannelSetError),
    /// The configured bind address does not parse.
    BadAddress(String),
    /// Creating or binding the socket failed.
    Bind(std::io::Error),
    /// Persisting or loading the descriptor failed.
    Config(ConfigError),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceError::Channels(err) => write!(f, "channel setup: {}", err),
            DeviceError::BadAddress(addr) => write!(f, "invalid bind address {:?}", addr),
            DeviceError::Bind(err) => write!(f, "could not bind socket: {}", err),
            DeviceError::Config(err) => write!(f, "descriptor: {}", err),
        }
    }
}

impl std::error::Error for DeviceError {}

impl From<ChannelSetError> for DeviceError {
    fn from(err: ChannelSetError) -> Self {
        DeviceError::Channels(err)
    }
}

impl From<ConfigError> for DeviceError {
    fn from(err: ConfigError) -> Self {
        DeviceError::Config(err)
    }
}

/// The EMG-over-UDP producer.
///
/// Construction validates the descriptor; [`start`](SampleProducer::start)
/// binds the socket and spawns the feed thread; consumer calls are safe
/// from any thread while the feed runs. [`stop`](SampleProducer::stop)
/// joins the thread, takes the final calibration maxima back from it, and
/// optionally writes them into the descriptor file for the next session.
pub struct EmgUdpDevice {
    config: DeviceConfig,
    channels: ChannelSet,
    addr: SocketAddr,
    store: SampleStore,
    running: Arc<AtomicBool>,
    feed: Option<JoinHandle<Calibrator>>,
    sink: Option<Box<dyn SampleSink>>,
    write_back: Option<PathBuf>,
}

impl EmgUdpDevice {
    /// Validates `config` and prepares a device in its zeroed state.
    pub fn new(config: DeviceConfig) -> Result<Self, DeviceError> {
        Self::with_collaborators(config, None, None)
    }

    /// Like [`new`](Self::new), with the external collaborators attached:
    /// a sink that will receive every published sample, and a descriptor
    /// path the final calibration maxima are written back to on stop.
    pub fn with_collaborators(
        config: DeviceConfig,
        sink: Option<Box<dyn SampleSink>>,
        write_back: Option<PathBuf>,
    ) -> Result<Self, DeviceError> {
        let channels = ChannelSet::new(config.channels.clone())?;
        let addr = config
            .socket_addr()
            .map_err(|_| DeviceError::BadAddress(format!("{}:{}", config.bind_ip, config.port)))?;
        let store = SampleStore::new(channels.len());

        Ok(EmgUdpDevice {
            config,
            channels,
            addr,
            store,
            running: Arc::new(AtomicBool::new(false)),
            feed: None,
            sink,
            write_back,
        })
    }

    /// The channel set the device was configured with.
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// The address the receiving socket binds to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether the feed thread is currently acquiring.
    pub fn is_running(&self) -> bool {
        self.feed.is_some()
    }

    /// Calibration maxima as of the last stop, aligned to channel order.
    /// `None` until the first session has run (or if none were configured).
    pub fn max_amplitudes(&self) -> Option<&[f64]> {
        self.config.max_amplitudes.as_deref()
    }
}

impl SampleProducer for EmgUdpDevice {
    type Error = DeviceError;

    fn start(&mut self) -> Result<(), DeviceError> {
        if self.feed.is_some() {
            return Ok(());
        }

        let socket = acquisition::bind_socket(self.addr, self.config.recv_timeout())
            .map_err(DeviceError::Bind)?;

        let calibrator = Calibrator::new(self.channels.len(), self.config.max_amplitudes.clone());

        self.running.store(true, Ordering::Relaxed);
        let feed = acquisition::spawn_feed(
            socket,
            self.store.clone(),
            calibrator,
            Box::new(SessionClock::new()),
            self.sink.take(),
            self.running.clone(),
        );
        self.feed = Some(feed);

        info!(
            "acquiring {} channels on {}",
            self.channels.len(),
            self.addr
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);

        // No-op when never started or already stopped.
        let Some(feed) = self.feed.take() else {
            return;
        };

        match feed.join() {
            Ok(calibrator) => {
                self.config.max_amplitudes = Some(calibrator.max_amplitudes().to_vec());
                if let Some(path) = &self.write_back {
                    match self.config.to_path(path) {
                        Ok(()) => info!("calibration maxima written to {}", path.display()),
                        Err(err) => warn!("could not persist calibration maxima: {}", err),
                    }
                }
            }
            Err(_) => error!("feed thread panicked; calibration maxima lost"),
        }
    }

    fn data_map(&self) -> HashMap<String, f64> {
        match self.store.consume() {
            // A wrong-arity sample cannot normally happen, but stale or
            // malformed data degrades to zeros rather than propagating.
            Some(values) if values.len() == self.channels.len() => self
                .channels
                .names()
                .iter()
                .cloned()
                .zip(values)
                .collect(),
            _ => self
                .channels
                .names()
                .iter()
                .map(|name| (name.clone(), 0.0))
                .collect(),
        }
    }

    fn time(&self) -> f64 {
        self.store.time()
    }
}

impl Drop for EmgUdpDevice {
    fn drop(&mut self) {
        self.stop();
    }
}
