//! The thread-safe cell holding the most recent normalized sample.
//!
//! One feed thread publishes into the store; the host thread consumes from
//! it. Values, freshness flag, and timestamp live under a single mutex so a
//! reader can never observe a half-written combination of them.

use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Latest {
    values: Vec<f64>,
    fresh: bool,
    time: f64,
}

/// Clonable handle to the latest-sample cell shared between the feed thread
/// and the consumer.
#[derive(Debug, Clone)]
pub struct SampleStore {
    latest: Arc<Mutex<Latest>>,
}

impl SampleStore {
    /// A store holding an all-zero sample of `n_channels` values, not yet
    /// marked fresh.
    pub fn new(n_channels: usize) -> Self {
        SampleStore {
            latest: Arc::new(Mutex::new(Latest {
                values: vec![0.0; n_channels],
                fresh: false,
                time: 0.0,
            })),
        }
    }

    // A poisoned mutex only means the other thread panicked mid-hold; the
    // cell itself is a plain value and stays usable.
    fn lock(&self) -> MutexGuard<'_, Latest> {
        match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Overwrites the latest sample and marks it fresh.
    pub fn publish(&self, values: Vec<f64>, time: f64) {
        let mut latest = self.lock();
        latest.values = values;
        latest.time = time;
        latest.fresh = true;
    }

    /// Takes the latest sample if one has arrived since the previous call,
    /// clearing the freshness flag. Returns `None` when nothing new is
    /// available.
    pub fn consume(&self) -> Option<Vec<f64>> {
        let mut latest = self.lock();
        if latest.fresh {
            latest.fresh = false;
            Some(latest.values.clone())
        } else {
            None
        }
    }

    /// Session time of the latest published sample, 0.0 before the first.
    pub fn time(&self) -> f64 {
        self.lock().time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_stale() {
        let store = SampleStore::new(3);
        assert_eq!(store.consume(), None);
        assert_eq!(store.time(), 0.0);
    }

    #[test]
    fn publish_then_consume() {
        let store = SampleStore::new(2);
        store.publish(vec![0.5, 1.0], 1.25);
        assert_eq!(store.consume(), Some(vec![0.5, 1.0]));
        assert_eq!(store.time(), 1.25);
    }

    #[test]
    fn second_consume_reports_nothing_new() {
        let store = SampleStore::new(2);
        store.publish(vec![0.5, 1.0], 1.0);
        assert!(store.consume().is_some());
        assert_eq!(store.consume(), None);
    }

    #[test]
    fn later_publish_overwrites() {
        let store = SampleStore::new(1);
        store.publish(vec![0.1], 1.0);
        store.publish(vec![0.9], 2.0);
        assert_eq!(store.consume(), Some(vec![0.9]));
        assert_eq!(store.time(), 2.0);
    }

    #[test]
    fn time_survives_consume() {
        let store = SampleStore::new(1);
        store.publish(vec![0.1], 3.5);
        store.consume();
        assert_eq!(store.time(), 3.5);
    }

    #[test]
    fn shared_across_threads() {
        let store = SampleStore::new(1);
        let producer = store.clone();
        let handle = thread::spawn(move || {
            for i in 0..100 {
                producer.publish(vec![i as f64 / 100.0], i as f64);
            }
        });
        // Any observed sample must be a complete one.
        while store.time() < 99.0 {
            if let Some(values) = store.consume() {
                assert_eq!(values.len(), 1);
            }
        }
        handle.join().unwrap();
        assert_eq!(store.time(), 99.0);
    }
}
