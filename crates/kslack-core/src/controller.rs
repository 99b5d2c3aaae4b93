use serde::{Deserialize, Serialize};

/// Proportional gain.
pub const KP: f64 = 0.5;
/// Derivative gain.
pub const KD: f64 = 0.8;

/// A discrete proportional-derivative loop driving the window
/// multiplier `alpha` toward the coverage target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaController {
    alpha: f64,
    previous_alpha: f64,
    previous_error: f64,
}

impl Default for AlphaController {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            previous_alpha: 0.0,
            previous_error: 0.0,
        }
    }
}

impl AlphaController {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(alpha: f64, previous_alpha: f64, previous_error: f64) -> Self {
        Self {
            alpha,
            previous_alpha,
            previous_error,
        }
    }

    /// The current multiplier.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn previous_alpha(&self) -> f64 {
        self.previous_alpha
    }

    pub fn previous_error(&self) -> f64 {
        self.previous_error
    }

    /// Feeds one observation and returns the new alpha.
    ///
    /// A positive error means the window covers less than the target.
    /// The absolute value keeps the multiplier non-negative, so the loop
    /// bounces off zero instead of settling below it.
    pub fn update(&mut self, coverage_threshold: f64, runtime_coverage: f64) -> f64 {
        let error = coverage_threshold - runtime_coverage;
        let delta = KP * error + KD * (error - self.previous_error);
        let alpha = (self.previous_alpha + delta).abs();

        self.previous_error = error;
        self.previous_alpha = alpha;
        self.alpha = alpha;
        alpha
    }
}
