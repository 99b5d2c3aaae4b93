//! Configuration parsing and validation for the kslack node.
//!
//! Event timestamps read by the node are milliseconds since the Unix
//! epoch, so every duration below is converted to milliseconds.

use eyre::{Result, WrapErr, bail, ensure};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Reordering parameters.
    pub reorder: ReorderConfig,

    /// Accuracy of the coverage estimate.
    #[serde(default)]
    pub accuracy: AccuracyConfig,

    /// Input and output line format.
    #[serde(default)]
    pub io: IoConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&contents)
            .wrap_err_with(|| format!("Failed to load config file: {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(contents).wrap_err("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        self.reorder.timeout_millis()?;
        self.reorder.max_k_millis()?;

        ensure!(
            !self.reorder.wake_interval.is_zero(),
            "reorder.wake_interval must be greater than zero"
        );
        ensure!(
            !self.io.delimiter.is_empty(),
            "io.delimiter cannot be empty"
        );

        self.to_reorder_config()?
            .validate()
            .wrap_err("Invalid reorder configuration")?;

        Ok(())
    }

    /// Convert to kslack-core Config.
    pub fn to_reorder_config(&self) -> Result<kslack_core::Config> {
        let reorder = &self.reorder;

        Ok(kslack_core::Config {
            batch_size: reorder.batch_size,
            timeout: reorder.timeout_millis()?,
            max_k: reorder.max_k_millis()?,
            discard_late_arrivals: reorder.discard_late_arrivals,
            error_threshold: self.accuracy.error_threshold,
            confidence_level: self.accuracy.confidence_level,
            coverage_span: millis(reorder.coverage_span),
            wake_interval: millis(reorder.wake_interval),
        })
    }
}

/// Reordering parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderConfig {
    /// Events between two alpha recomputations.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// How long an event may stay buffered. `-1` or absent disables the
    /// timeout.
    #[serde(default)]
    pub timeout: Option<TimeoutSetting>,

    /// Upper bound on the window in milliseconds. `-1` means unbounded.
    #[serde(default = "default_max_k")]
    pub max_k: i64,

    /// Drop events older than the last emitted one.
    #[serde(default)]
    pub discard_late_arrivals: bool,

    /// Only recent events within this span take part in the runtime
    /// coverage estimate.
    #[serde(with = "humantime_serde", default = "default_coverage_span")]
    pub coverage_span: Duration,

    /// Step between two timeout ticks while events remain buffered.
    #[serde(with = "humantime_serde", default = "default_wake_interval")]
    pub wake_interval: Duration,
}

impl ReorderConfig {
    fn timeout_millis(&self) -> Result<Option<i64>> {
        let timeout = match self.timeout {
            None | Some(TimeoutSetting::Millis(-1)) => None,
            Some(TimeoutSetting::Millis(ms)) => {
                ensure!(ms > 0, "reorder.timeout must be positive or -1, got {ms}");
                Some(ms)
            }
            Some(TimeoutSetting::Duration(duration)) => {
                ensure!(
                    !duration.is_zero(),
                    "reorder.timeout must be greater than zero"
                );
                Some(millis(duration))
            }
        };
        Ok(timeout)
    }

    fn max_k_millis(&self) -> Result<Option<i64>> {
        match self.max_k {
            -1 => Ok(None),
            max_k if max_k >= 0 => Ok(Some(max_k)),
            max_k => bail!("reorder.max_k must be non-negative or -1, got {max_k}"),
        }
    }
}

/// A timeout given either as milliseconds or as a human-readable
/// duration such as `"1s"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TimeoutSetting {
    Millis(i64),
    Duration(#[serde(with = "humantime_serde")] Duration),
}

/// Accuracy of the coverage estimate.
#[derive(Debug, Clone, Deserialize)]
pub struct AccuracyConfig {
    /// Tolerated relative error of aggregates over the correlation
    /// column.
    #[serde(default = "default_error_threshold")]
    pub error_threshold: f64,

    /// Confidence level, in (0, 1).
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

impl Default for AccuracyConfig {
    fn default() -> Self {
        Self {
            error_threshold: default_error_threshold(),
            confidence_level: default_confidence_level(),
        }
    }
}

/// Line format of the events read from stdin and written to stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct IoConfig {
    /// Separator between timestamp, correlation value and payload.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn default_batch_size() -> u64 {
    kslack_core::Config::default().batch_size
}

fn default_max_k() -> i64 {
    -1
}

fn default_coverage_span() -> Duration {
    Duration::from_millis(kslack_core::Config::default().coverage_span as u64)
}

fn default_wake_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_error_threshold() -> f64 {
    kslack_core::Config::default().error_threshold
}

fn default_confidence_level() -> f64 {
    kslack_core::Config::default().confidence_level
}

fn default_delimiter() -> String {
    ",".to_string()
}
