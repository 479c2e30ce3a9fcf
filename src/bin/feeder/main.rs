//! Stand-in for the acquisition device: streams synthetic EMG frames over
//! UDP at a fixed rate until killed. Each channel gets a slow contraction
//! envelope with measurement noise on top, formatted the way the real
//! firmware formats frames (`[v1,v2,...]`, optionally with quoted values).

use clap::Parser;
use emgbridge::args::FeederArgs;
use log::info;
use rand::Rng;
use std::error::Error;
use std::f64::consts::PI;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

fn synth_sample(t: f64, channel: usize) -> f64 {
    // Per-channel phase so the channels do not move in lockstep.
    let phase = channel as f64 * PI / 3.0;
    let envelope = (2.0 * PI * 0.25 * t + phase).sin().abs();
    let amplitude = 1.0 + channel as f64 * 0.5;
    amplitude * envelope
}

fn format_frame(values: &[f64], quoted: bool) -> String {
    let body = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if quoted && i % 2 == 1 {
                format!("\"{:.4}\"", v)
            } else {
                format!("{:.4}", v)
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("[{}]", body)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = FeederArgs::parse();

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    let period = Duration::from_secs_f64(1.0 / args.rate);
    let sleeper = spin_sleep::SpinSleeper::default();
    let mut rng = rand::thread_rng();

    info!(
        "feeding {} channels to {} at {} Hz",
        args.channels, args.target, args.rate
    );

    let start = Instant::now();
    loop {
        let t = start.elapsed().as_secs_f64();
        let values: Vec<f64> = (0..args.channels)
            .map(|i| synth_sample(t, i) + rng.gen_range(-0.02..0.02))
            .collect();

        let frame = format_frame(&values, args.quoted);
        socket.send_to(frame.as_bytes(), &args.target)?;

        sleeper.sleep(period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_bracketed() {
        let frame = format_frame(&[1.0, 2.5], false);
        assert_eq!(frame, "[1.0000,2.5000]");
    }

    #[test]
    fn quoted_frames_quote_every_other_value() {
        let frame = format_frame(&[1.0, 2.5, 3.0], true);
        assert_eq!(frame, "[1.0000,\"2.5000\",3.0000]");
    }
}
