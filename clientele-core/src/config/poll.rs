//! Confirmation polling configuration.

use std::time::Duration;

/// Errors returned when building a [`PollConfig`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PollConfigError {
    #[error("{field} must be a positive number of seconds, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("initial interval ({initial:?}) exceeds the maximum interval ({max:?})")]
    InitialExceedsMax { initial: Duration, max: Duration },

    #[error("back-off factor must be a finite number >= 1, got {0}")]
    InvalidBackOffFactor(f64),
}

/// Bounds of a confirmation polling loop.
///
/// The wait between two lookups starts at `initial_interval`, is multiplied
/// by `back_off_factor` after every unsuccessful lookup and never exceeds
/// `max_interval`. Polling stops once the accumulated wait reaches
/// `max_total`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollConfig {
    pub max_total: Duration,
    pub max_interval: Duration,
    pub initial_interval: Duration,
    pub back_off_factor: f64,
}

impl PollConfig {
    /// Build a config from second values, validating every field.
    pub fn from_secs(
        max_total_secs: f64,
        max_interval_secs: f64,
        initial_interval_secs: f64,
        back_off_factor: f64,
    ) -> Result<Self, PollConfigError> {
        let config = Self {
            max_total: positive_secs("max_total_seconds", max_total_secs)?,
            max_interval: positive_secs("max_interval_seconds", max_interval_secs)?,
            initial_interval: positive_secs("initial_interval_seconds", initial_interval_secs)?,
            back_off_factor,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the polling loop relies on.
    pub fn validate(&self) -> Result<(), PollConfigError> {
        if self.max_total.is_zero() {
            return Err(PollConfigError::NotPositive {
                field: "max_total_seconds",
                value: 0.0,
            });
        }
        if self.initial_interval.is_zero() {
            return Err(PollConfigError::NotPositive {
                field: "initial_interval_seconds",
                value: 0.0,
            });
        }
        if self.initial_interval > self.max_interval {
            return Err(PollConfigError::InitialExceedsMax {
                initial: self.initial_interval,
                max: self.max_interval,
            });
        }
        // A factor below 1 would shrink the interval.
        if !self.back_off_factor.is_finite() || self.back_off_factor < 1.0 {
            return Err(PollConfigError::InvalidBackOffFactor(self.back_off_factor));
        }
        Ok(())
    }
}

impl Default for PollConfig {
    /// 480 s in total, 1 s initial interval doubling up to 30 s.
    fn default() -> Self {
        Self {
            max_total: Duration::from_secs(480),
            max_interval: Duration::from_secs(30),
            initial_interval: Duration::from_secs(1),
            back_off_factor: 2.0,
        }
    }
}

fn positive_secs(field: &'static str, value: f64) -> Result<Duration, PollConfigError> {
    if value.is_nan() || value <= 0.0 {
        return Err(PollConfigError::NotPositive { field, value });
    }
    Duration::try_from_secs_f64(value).map_err(|_| PollConfigError::NotPositive { field, value })
}
