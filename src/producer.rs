//! The small capability interface a host composes a sample producer
//! through. Hosts link producers statically (or register them explicitly)
//! instead of loading them as dynamic plugins.

use std::collections::HashMap;

/// A source of named, normalized channel readings that a control loop can
/// poll without ever blocking on the producer's I/O.
pub trait SampleProducer {
    /// Error raised when acquisition cannot begin.
    type Error;

    /// Begins acquiring; returns as soon as the background work is running.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Stops acquiring and releases resources. Must be idempotent and safe
    /// to call even if `start` never ran.
    fn stop(&mut self);

    /// Latest normalized reading per channel, or 0.0 for every channel when
    /// nothing fresh is available.
    fn data_map(&self) -> HashMap<String, f64>;

    /// Session time of the latest reading, in seconds.
    fn time(&self) -> f64;
}
