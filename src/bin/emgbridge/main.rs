//! Minimal host harness: open the device from a descriptor, print the data
//! map at a fixed cadence for a while, then stop. Handy for checking a rig
//! end to end together with the `feeder` binary.
//!
//! Example:
//!
//! ```text
//! cargo run --bin emgbridge -- --config device.ron --time 30 --record session.log
//! ```

use clap::Parser;
use emgbridge::{
    args::BridgeArgs,
    config::DeviceConfig,
    device::EmgUdpDevice,
    producer::SampleProducer,
    session_log::{SampleSink, SessionLogWriter},
};

use log::info;
use std::error::Error;
use std::thread::sleep;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = BridgeArgs::parse();

    let config = DeviceConfig::from_path(&args.config)?;

    let sink: Option<Box<dyn SampleSink>> = match &args.record {
        Some(path) => {
            info!("recording session to {}", path.display());
            Some(Box::new(SessionLogWriter::create(
                path,
                config.channels.clone(),
            )?))
        }
        None => None,
    };
    let write_back = args.save_calibration.then(|| args.config.clone());

    let mut device = EmgUdpDevice::with_collaborators(config, sink, write_back)?;
    device.start()?;

    let names: Vec<String> = device.channels().names().to_vec();
    let deadline = Instant::now() + Duration::from_secs_f64(args.duration);

    while Instant::now() < deadline {
        let data = device.data_map();
        let line = names
            .iter()
            .map(|name| format!("{}={:.3}", name, data[name.as_str()]))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{:9.3} : {}", device.time(), line);
        sleep(Duration::from_millis(args.interval_ms));
    }

    device.stop();
    println!("exit");
    Ok(())
}
