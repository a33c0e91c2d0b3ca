//! Mission tuning.
//!
//! [`MissionConfig`] gathers every knob of one run: thresholds, sweep
//! geometry, approach loop tuning, the back-away manoeuvre and the retry
//! bounds that keep the sequencer from looping forever.  Every section is
//! `#[serde(default)]`, so a config file only needs the values it changes.

use std::time::Duration;

use retriever_nav::{ApproachConfig, ScannerConfig};
use retriever_types::{RetrieveError, Thresholds, duration_from_secs};
use serde::{Deserialize, Serialize};

/// Straight reverse drive performed after a failed grasp, between rally
/// attempts, and after every release.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Metres per second; must be negative.
    pub speed: f32,
    pub secs: f32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            speed: -0.5,
            secs: 0.6,
        }
    }
}

impl BackoffConfig {
    pub fn duration(&self) -> Duration {
        duration_from_secs(self.secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub thresholds: Thresholds,
    pub scanner: ScannerConfig,
    pub approach: ApproachConfig,
    pub backoff: BackoffConfig,
    /// Grasps tried on one marker before the mission aborts.
    pub max_grasp_attempts: u32,
    /// Rally-point approaches tried while holding an object.
    pub max_rally_attempts: u32,
    /// Consecutive unreachable rounds over the whole queue before the
    /// mission is declared stalled.
    pub max_requeue_rounds: u32,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            scanner: ScannerConfig::default(),
            approach: ApproachConfig::default(),
            backoff: BackoffConfig::default(),
            max_grasp_attempts: 3,
            max_rally_attempts: 3,
            max_requeue_rounds: 3,
        }
    }
}

impl MissionConfig {
    /// # Errors
    ///
    /// [`RetrieveError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), RetrieveError> {
        self.thresholds.validate()?;
        self.scanner.validate()?;
        self.approach.validate()?;

        if !(self.backoff.speed.is_finite() && self.backoff.speed < 0.0) {
            return Err(RetrieveError::InvalidConfig(format!(
                "backoff.speed must be negative, got {}",
                self.backoff.speed
            )));
        }
        if !(self.backoff.secs.is_finite() && self.backoff.secs > 0.0) {
            return Err(RetrieveError::InvalidConfig(format!(
                "backoff.secs must be positive, got {}",
                self.backoff.secs
            )));
        }

        let bounds = [
            ("max_grasp_attempts", self.max_grasp_attempts),
            ("max_rally_attempts", self.max_rally_attempts),
            ("max_requeue_rounds", self.max_requeue_rounds),
        ];
        for (name, value) in bounds {
            if value == 0 {
                return Err(RetrieveError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MissionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_grasp_attempts, 3);
        let backoff = config.backoff.duration().as_secs_f64();
        assert!((backoff - 0.6).abs() < 1e-6, "backoff lasts {backoff} s");
    }

    #[test]
    fn nonsense_backoff_duration_is_zero() {
        let backoff = BackoffConfig { speed: -0.5, secs: f32::NAN };
        assert_eq!(backoff.duration(), Duration::ZERO);
    }

    #[test]
    fn forward_backoff_is_rejected() {
        let config = MissionConfig {
            backoff: BackoffConfig { speed: 0.5, secs: 0.6 },
            ..MissionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backoff.speed"));
    }

    #[test]
    fn zero_retry_bounds_are_rejected() {
        let config = MissionConfig {
            max_requeue_rounds: 0,
            ..MissionConfig::default()
        };
        assert!(matches!(config.validate(), Err(RetrieveError::InvalidConfig(msg)) if msg.contains("max_requeue_rounds")));
    }

    #[test]
    fn nested_errors_surface() {
        let mut config = MissionConfig::default();
        config.scanner.speed = 0.0;
        assert!(config.validate().is_err());

        let mut config = MissionConfig::default();
        config.thresholds.angle_deg = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: MissionConfig =
            serde_json::from_str(r#"{"max_grasp_attempts": 5, "thresholds": {"pickup_distance": 0.3}}"#).unwrap();
        assert_eq!(config.max_grasp_attempts, 5);
        assert!((config.thresholds.pickup_distance - 0.3).abs() < 1e-6);
        assert!((config.thresholds.rally_distance - 0.53).abs() < 1e-6);
        assert_eq!(config.approach, ApproachConfig::default());
    }
}
