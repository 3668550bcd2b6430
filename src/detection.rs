//! Collapse detectors over the entropy history.
//!
//! Both detectors look at the whole history on every call and report the
//! earliest step that qualifies, so a record that qualifies late in the run
//! can still be reported against an earlier step.

use serde::Serialize;

use crate::state::EntropyRecord;

/// A collapse detection strategy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum CollapseDetector {
    /// Flag the first step whose entropy change falls below `threshold`.
    Threshold {
        /// Negative entropy change in nats.
        threshold: f64,
    },
    /// Flag the first step whose entropy change is an outlier on the low side.
    ZScore {
        /// Number of standard deviations below the mean.
        z_threshold: f64,
        /// Records required before the detector activates.
        min_history: usize,
    },
}

impl CollapseDetector {
    /// Step of the earliest qualifying record, if any.
    ///
    /// # Examples
    /// ```
    /// use collapsex::{CollapseDetector, EntropyRecord};
    ///
    /// let history: Vec<EntropyRecord> = [0.7, -0.1, -0.6]
    ///     .iter()
    ///     .enumerate()
    ///     .map(|(step, delta)| EntropyRecord {
    ///         step,
    ///         entropy: 0.0,
    ///         delta_entropy: *delta,
    ///         energy_distribution: Vec::new(),
    ///     })
    ///     .collect();
    /// let detector = CollapseDetector::Threshold { threshold: -0.5 };
    /// assert_eq!(detector.detect(&history), Some(2));
    /// ```
    #[must_use]
    pub fn detect(&self, history: &[EntropyRecord]) -> Option<usize> {
        match *self {
            Self::Threshold { threshold } => history
                .iter()
                .find(|record| record.delta_entropy < threshold)
                .map(|record| record.step),
            Self::ZScore {
                z_threshold,
                min_history,
            } => detect_outlier(history, z_threshold, min_history),
        }
    }
}

/// Z-score test against the population mean and deviation of every recorded change.
fn detect_outlier(history: &[EntropyRecord], z_threshold: f64, min_history: usize) -> Option<usize> {
    if history.is_empty() || history.len() < min_history {
        return None;
    }
    let n = history.len() as f64;
    let mean = history.iter().map(|record| record.delta_entropy).sum::<f64>() / n;
    let variance = history
        .iter()
        .map(|record| (record.delta_entropy - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = variance.sqrt();
    if std == 0.0 {
        return None;
    }
    history
        .iter()
        .find(|record| (record.delta_entropy - mean) / std < -z_threshold)
        .map(|record| record.step)
}
