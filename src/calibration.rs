//! Continuous self-calibration of the incoming signal.
//!
//! There is no separate calibration mode: every raw sample pushes the
//! per-channel running maximum up, and that maximum is the normalization
//! denominator from then on. The maximum never decays within a session; it
//! only changes on an explicit [`Calibrator::reload`].

/// Denominators at or below this are treated as "no usable maximum yet".
pub const EPSILON: f64 = 1e-6;

/// Per-channel running-maximum state and the rescaling built on it.
///
/// A `Calibrator` is owned by the feed thread for the whole session and
/// handed back to the lifecycle code after the thread has joined, so no
/// locking is needed here.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibrator {
    max_amplitudes: Vec<f64>,
}

impl Calibrator {
    /// Builds calibration state for `n_channels` channels.
    ///
    /// `prior` carries maxima saved from an earlier session. Entries that
    /// are missing, non-finite, or at/below [`EPSILON`] default to 1.0 so
    /// that early normalization is a no-op instead of a division artifact.
    pub fn new(n_channels: usize, prior: Option<Vec<f64>>) -> Self {
        let mut max_amplitudes = prior.unwrap_or_default();
        max_amplitudes.resize(n_channels, 1.0);
        for max in &mut max_amplitudes {
            if !max.is_finite() || *max <= EPSILON {
                *max = 1.0;
            }
        }
        Calibrator { max_amplitudes }
    }

    /// Number of channels this state is aligned to.
    pub fn len(&self) -> usize {
        self.max_amplitudes.len()
    }

    /// True only for a zero-channel calibrator, which the device never builds.
    pub fn is_empty(&self) -> bool {
        self.max_amplitudes.is_empty()
    }

    /// Folds one raw sample into the running maxima and returns the
    /// normalized sample, each value clamped into `[0, 1]`.
    ///
    /// `raw` must be aligned to the channel set; the feed loop guarantees
    /// this by construction (the decoder always yields `len()` values).
    pub fn process(&mut self, raw: &[f64]) -> Vec<f64> {
        debug_assert_eq!(raw.len(), self.max_amplitudes.len());
        raw.iter()
            .zip(self.max_amplitudes.iter_mut())
            .map(|(&value, max)| {
                if value > *max {
                    *max = value;
                }
                if *max > EPSILON {
                    (value / *max).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// The session maxima, aligned to channel order, for persistence.
    pub fn max_amplitudes(&self) -> &[f64] {
        &self.max_amplitudes
    }

    /// Replaces the running maxima with externally supplied values.
    ///
    /// This is the only way the maxima ever go down; it exists so a host
    /// can re-seed calibration (e.g. after repositioning electrodes)
    /// without tearing the whole device down.
    pub fn reload(&mut self, prior: Vec<f64>) {
        let n = self.max_amplitudes.len();
        *self = Calibrator::new(n, Some(prior));
    }
}
