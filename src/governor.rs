//! Threshold-triggered session abort.

use crate::tally::GroupTally;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Continue,
    /// Stop every remaining group.
    Abort {
        /// Configured tolerated failure fraction.
        tolerance: f64,
        /// Observed failure fraction.
        failure_rate: f64,
    },
}

impl Decision {
    pub fn is_abort(&self) -> bool {
        matches!(self, Decision::Abort { .. })
    }
}

/// Aborts when a group's failure fraction strictly exceeds its threshold.
/// A threshold of 1.0 can never be exceeded.
pub fn evaluate(panic_threshold: f64, tally: &GroupTally) -> Decision {
    let failure_rate = tally.failure_fraction();
    if failure_rate > panic_threshold {
        Decision::Abort {
            tolerance: panic_threshold,
            failure_rate,
        }
    } else {
        Decision::Continue
    }
}
