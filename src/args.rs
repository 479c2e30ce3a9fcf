// Commandline argument parsers using clap for the emgbridge binaries

use clap::Parser;
use std::path::PathBuf;

/// Arguments for the `emgbridge` host harness.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct BridgeArgs {
    /// Path to the device descriptor (ron)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Record normalized samples to this session log file
    #[arg(short, long)]
    pub record: Option<PathBuf>,

    /// Write updated calibration maxima back into the descriptor on exit
    #[arg(long)]
    pub save_calibration: bool,

    /// How long to run before stopping, in seconds
    #[arg(short = 't', long = "time", default_value_t = 10.0)]
    pub duration: f64,

    /// How often to print the data map, in milliseconds
    #[arg(short, long, default_value_t = 100)]
    pub interval_ms: u64,
}

/// Arguments for the `monitor` live-level display.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct MonitorArgs {
    /// Path to the device descriptor (ron)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Display refresh period, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,
}

/// Arguments for the `feeder` synthetic acquisition device.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct FeederArgs {
    /// Destination address for the synthetic datagrams
    #[arg(short = 'd', long, default_value = "127.0.0.1:31000")]
    pub target: String,

    /// Number of channels per frame
    #[arg(short = 'n', long, default_value_t = 4)]
    pub channels: usize,

    /// Datagrams per second
    #[arg(short, long, default_value_t = 100.0)]
    pub rate: f64,

    /// Quote every other value, as some acquisition firmwares do
    #[arg(short, long)]
    pub quoted: bool,
}
