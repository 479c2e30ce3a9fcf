mod gui;

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use emgbridge::args::MonitorArgs;
use emgbridge::config::DeviceConfig;
use emgbridge::device::EmgUdpDevice;
use emgbridge::producer::SampleProducer;
use gui::engage_gui;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = MonitorArgs::parse();

    let config = DeviceConfig::from_path(&args.config)?;
    let mut device = EmgUdpDevice::new(config)?;
    device.start()?;

    let names = device.channels().names().to_vec();
    let device_mtx = Arc::new(Mutex::new(device));
    let device = device_mtx.clone();

    let levels_device = device_mtx.clone();
    let time_device = device_mtx.clone();

    engage_gui(
        Box::new(move || {
            let device = levels_device.lock().unwrap();
            let data = device.data_map();
            names
                .iter()
                .map(|name| (name.clone(), data[name.as_str()]))
                .collect()
        }),
        Box::new(move || time_device.lock().unwrap().time()),
        Duration::from_millis(args.tick_ms),
    )?;

    device.lock().unwrap().stop();
    Ok(())
}
