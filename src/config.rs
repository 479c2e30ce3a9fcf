//! The on-disk device descriptor: which channels to expect, where to listen
//! for datagrams, and (optionally) calibration maxima carried over from an
//! earlier session. Stored as [ron] so it stays hand-editable.
//!
//! ```text
//! (
//!     channels: ["EMG1", "EMG2", "EMG3", "EMG4"],
//!     bind_ip: "127.0.0.1",
//!     port: 31000,
//!     max_amplitudes: Some([1.8, 2.2, 1.0, 3.4]),
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs,
    net::{AddrParseError, SocketAddr},
    path::Path,
    time::Duration,
};

fn default_bind_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    31000
}

fn default_recv_timeout_ms() -> u64 {
    100
}

/// Everything the device needs to start acquiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Channel names, in the order values appear in each datagram.
    pub channels: Vec<String>,
    /// Address to bind the receiving socket to.
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,
    /// Port the acquisition device sends to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-channel calibration maxima from a previous session, aligned to
    /// `channels`. Missing or zeroed entries fall back to a unit maximum.
    #[serde(default)]
    pub max_amplitudes: Option<Vec<f64>>,
    /// Bounded-wait receive window; also the worst-case stop latency.
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,
}

/// Why a descriptor could not be loaded or saved.
#[derive(Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    IoError(std::io::Error),
    /// The file is not a valid descriptor.
    RonSpannedError(ron::de::SpannedError),
    /// Serializing the descriptor failed.
    RonError(ron::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::IoError(error) => write!(f, "io error: {}", error),
            ConfigError::RonSpannedError(error) => write!(f, "ron error: {}", error),
            ConfigError::RonError(error) => write!(f, "ron error: {}", error),
        }
    }
}

impl std::error::Error for ConfigError {}

impl DeviceConfig {
    /// Loads a descriptor from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        ron::from_str(&text).map_err(ConfigError::RonSpannedError)
    }

    /// Writes the descriptor back out, pretty-printed. Used at stop time to
    /// persist the final calibration maxima.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::RonError)?;
        fs::write(path, text).map_err(ConfigError::IoError)
    }

    /// The bind address as a socket address. An unparsable address is a
    /// fatal initialization error for the device.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.bind_ip, self.port).parse()
    }

    /// The bounded-wait receive window as a [`Duration`].
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> DeviceConfig {
        DeviceConfig {
            channels: vec!["EMG1".to_string(), "EMG2".to_string()],
            bind_ip: "127.0.0.1".to_string(),
            port: 31000,
            max_amplitudes: Some(vec![2.0, 4.0]),
            recv_timeout_ms: 100,
        }
    }

    #[test]
    fn round_trips_through_a_file() {
        let tempfile = tempfile::NamedTempFile::new().unwrap();
        let config = example();
        config.to_path(tempfile.path()).unwrap();
        let read_back = DeviceConfig::from_path(tempfile.path()).unwrap();
        assert_eq!(config, read_back);
    }

    #[test]
    fn minimal_descriptor_gets_defaults() {
        let config: DeviceConfig = ron::from_str(r#"(channels: ["EMG1"])"#).unwrap();
        assert_eq!(config.bind_ip, "127.0.0.1");
        assert_eq!(config.port, 31000);
        assert_eq!(config.max_amplitudes, None);
        assert_eq!(config.recv_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn socket_addr_parses() {
        let addr = example().socket_addr().unwrap();
        assert_eq!(addr.port(), 31000);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn bad_address_is_reported() {
        let mut config = example();
        config.bind_ip = "not-an-ip".to_string();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn unreadable_descriptor_is_reported() {
        assert!(matches!(
            DeviceConfig::from_path("/definitely/not/here.ron"),
            Err(ConfigError::IoError(_))
        ));
    }
}
