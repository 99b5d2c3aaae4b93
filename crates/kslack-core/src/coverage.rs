//! Window coverage estimation.
//!
//! The coverage threshold is the smallest fraction of the recent
//! correlation values that still estimates their mean within the
//! configured relative error at the configured confidence. The runtime
//! coverage is the fraction of recent events the current window would
//! have admitted in order. The alpha controller drives the latter toward
//! the former.

use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::VecDeque;

/// Two-sided critical value of the standard normal distribution for
/// the given confidence level.
pub fn critical_value(confidence_level: f64) -> f64 {
    Normal::standard()
        .inverse_cdf((1.0 - confidence_level) / 2.0)
        .abs()
}

/// Estimates the coverage target and the coverage actually achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowCoverage {
    error_threshold: f64,
    critical_value: f64,
}

impl WindowCoverage {
    pub fn new(error_threshold: f64, confidence_level: f64) -> Self {
        Self {
            error_threshold,
            critical_value: critical_value(confidence_level),
        }
    }

    pub fn critical_value(&self) -> f64 {
        self.critical_value
    }

    pub fn error_threshold(&self) -> f64 {
        self.error_threshold
    }

    /// The fraction of `samples` that must be covered so that the
    /// confidence interval half-width of their mean stays within
    /// `error_threshold` of the mean.
    ///
    /// Returns 0.0 for an empty or constant sample and 1.0 when the
    /// mean is zero but the values are dispersed.
    pub fn threshold<'a, I>(&self, samples: I) -> f64
    where
        I: IntoIterator<Item = &'a f64>,
        I::IntoIter: Clone,
    {
        let samples = samples.into_iter();
        let Some((mean, std_dev, n)) = mean_and_std_dev(samples) else {
            return 0.0;
        };

        if std_dev == 0.0 {
            return 0.0;
        }

        let tolerated = self.error_threshold * mean.abs();
        if tolerated == 0.0 {
            return 1.0;
        }

        let ratio = self.critical_value * std_dev / tolerated;
        let threshold = ratio * ratio / n as f64;

        if threshold.is_nan() {
            1.0
        } else {
            threshold.clamp(0.0, 1.0)
        }
    }

    /// The fraction of the timestamp sample, restricted to the last
    /// `span` before `latest`, that arrived no more than `window` behind
    /// the running maximum at its arrival.
    ///
    /// Returns 1.0 when no timestamp falls within the span.
    pub fn runtime_coverage(
        &self,
        latest: i64,
        timestamps: &VecDeque<i64>,
        window: i64,
        span: i64,
    ) -> f64 {
        let lower = latest.saturating_sub(span);
        let mut running_max: Option<i64> = None;
        let mut considered = 0usize;
        let mut covered = 0usize;

        for &ts in timestamps {
            if ts >= lower {
                considered += 1;
                let in_window = running_max.is_none_or(|max| ts.saturating_add(window) >= max);
                if in_window {
                    covered += 1;
                }
            }

            running_max = Some(running_max.map_or(ts, |max| max.max(ts)));
        }

        if considered == 0 {
            1.0
        } else {
            covered as f64 / considered as f64
        }
    }
}

/// Mean, sample standard deviation and count. The deviation is zero for
/// a single value.
fn mean_and_std_dev<'a, I>(samples: I) -> Option<(f64, f64, usize)>
where
    I: Iterator<Item = &'a f64> + Clone,
{
    let (sum, n) = samples
        .clone()
        .fold((0.0, 0usize), |(sum, n), value| (sum + value, n + 1));

    if n == 0 {
        return None;
    }

    let mean = sum / n as f64;
    if n == 1 {
        return Some((mean, 0.0, 1));
    }

    let squares: f64 = samples.map(|value| (value - mean).powi(2)).sum();
    let std_dev = (squares / (n - 1) as f64).sqrt();
    Some((mean, std_dev, n))
}
