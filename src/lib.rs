//! emgbridge feeds a biomechanics control loop from an electromyography
//! (EMG) acquisition device that streams samples as UDP datagrams. A
//! background thread receives each datagram, decodes its ASCII frame,
//! rescales every channel against a session-long running maximum, and
//! publishes the normalized sample into a guarded latest-sample cell the
//! control loop polls without ever blocking on the network.
//!
//! The transport is plain UDP: lossy, unordered, best-effort. The crate's
//! job is to stay correct and responsive in spite of that, not to paper
//! over it. Malformed datagrams cost one zeroed iteration and nothing
//! else, and stopping the device never waits longer than one receive
//! timeout.
//!
//! The usual entry point is [`device::EmgUdpDevice`], configured from a
//! [ron](https://crates.io/crates/ron) descriptor (see [`config`]). The
//! `emgbridge` binary is a minimal host, `monitor` shows live channel
//! levels in the terminal, and `feeder` plays the role of the acquisition
//! device for bench testing.

#![warn(missing_docs)]
pub mod acquisition;
pub mod args;
pub mod calibration;
pub mod channels;
pub mod clock;
pub mod config;
pub mod device;
pub mod frame;
pub mod producer;
pub mod session_log;
pub mod store;
