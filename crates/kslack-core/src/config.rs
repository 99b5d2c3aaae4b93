use eyre::{Result, ensure};
use serde::{Deserialize, Serialize};

/// The smallest batch accepted for an alpha recomputation.
pub const MIN_BATCH_SIZE: u64 = 15;

/// Configuration parameters that are passed to [State](crate::State),
/// [Partition](crate::Partition) and [reorder](crate::reorder()).
///
/// All durations are expressed in the unit of the event timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of buffered events between two alpha recomputations.
    pub batch_size: u64,
    /// Buffered events older than `now - timeout` are flushed on the
    /// next tick. None disables timeout flushing.
    pub timeout: Option<i64>,
    /// Upper bound on the K-Slack window. None means unbounded.
    pub max_k: Option<i64>,
    /// Drop events whose timestamp is below the last emitted one
    /// instead of letting them through late.
    pub discard_late_arrivals: bool,
    /// Tolerated relative error of aggregates over the correlation
    /// attribute.
    pub error_threshold: f64,
    /// Confidence level of the coverage estimate, in (0, 1).
    pub confidence_level: f64,
    /// Only timestamps within this span of the latest one take part in
    /// the runtime coverage estimate.
    pub coverage_span: i64,
    /// Step between two consecutive timeout ticks while events remain
    /// buffered.
    pub wake_interval: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            timeout: None,
            max_k: None,
            discard_late_arrivals: false,
            error_threshold: 0.03,
            confidence_level: 0.95,
            coverage_span: 10_000_000_000,
            wake_interval: 1000,
        }
    }
}

impl Config {
    /// Create a Config with the given batch size and defaults elsewhere.
    pub fn with_batch_size(batch_size: u64) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Enable timeout flushing.
    pub fn with_timeout(mut self, timeout: i64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bound the K-Slack window.
    pub fn with_max_k(mut self, max_k: i64) -> Self {
        self.max_k = Some(max_k);
        self
    }

    /// Set the late arrival policy.
    pub fn with_discard_late_arrivals(mut self, discard: bool) -> Self {
        self.discard_late_arrivals = discard;
        self
    }

    /// Set the error threshold and confidence level of the coverage
    /// estimate.
    pub fn with_accuracy(mut self, error_threshold: f64, confidence_level: f64) -> Self {
        self.error_threshold = error_threshold;
        self.confidence_level = confidence_level;
        self
    }

    /// The effective upper bound on K.
    pub fn max_k_or_unbounded(&self) -> i64 {
        self.max_k.unwrap_or(i64::MAX)
    }

    /// Reject configurations the reorder buffer cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.batch_size >= MIN_BATCH_SIZE,
            "batch_size must be at least {MIN_BATCH_SIZE}, got {}",
            self.batch_size
        );

        if let Some(max_k) = self.max_k {
            ensure!(max_k >= 0, "max_k must not be negative, got {max_k}");
        }

        if let Some(timeout) = self.timeout {
            ensure!(timeout > 0, "timeout must be positive, got {timeout}");
        }

        ensure!(
            self.confidence_level > 0.0 && self.confidence_level < 1.0,
            "confidence_level must be within (0, 1), got {}",
            self.confidence_level
        );
        ensure!(
            self.error_threshold.is_finite() && self.error_threshold > 0.0,
            "error_threshold must be a positive number, got {}",
            self.error_threshold
        );
        ensure!(
            self.coverage_span > 0,
            "coverage_span must be positive, got {}",
            self.coverage_span
        );
        ensure!(
            self.wake_interval > 0,
            "wake_interval must be positive, got {}",
            self.wake_interval
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.timeout, None);
        assert_eq!(config.max_k_or_unbounded(), i64::MAX);
        assert!(!config.discard_late_arrivals);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_lower_bound() {
        assert!(Config::with_batch_size(15).validate().is_ok());
        assert!(Config::with_batch_size(14).validate().is_err());
        assert!(Config::with_batch_size(0).validate().is_err());
    }

    #[test]
    fn test_negative_max_k_rejected() {
        let config = Config::with_batch_size(20).with_max_k(-1);
        assert!(config.validate().is_err());

        let config = Config::with_batch_size(20).with_max_k(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_confidence_level_range() {
        for level in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let config = Config::default().with_accuracy(0.03, level);
            assert!(config.validate().is_err(), "accepted {level}");
        }

        let config = Config::default().with_accuracy(0.05, 0.99);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_must_be_positive() {
        assert!(Config::default().with_timeout(0).validate().is_err());
        assert!(Config::default().with_timeout(1000).validate().is_ok());
    }
}
