//! Rotation plans with an explicit angular budget.
//!
//! A [`Sweep`] turns in fixed-duration increments.  Each increment sweeps
//! `|speed| × step_secs` degrees, and a sweep never issues more than
//! `ceil(budget_deg / increment)` of them.  Counting increments as integers
//! rather than accumulating floats keeps that bound exact.

use std::time::Duration;

use retriever_types::{RetrieveError, duration_from_secs};
use serde::{Deserialize, Serialize};

/// Upper bound on the increments of a single sweep.
pub const MAX_INCREMENTS: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    /// Turn speed in degrees per second; the sign picks the direction
    /// (positive is clockwise).
    pub speed: f32,
    /// Duration of one increment (seconds).
    pub step_secs: f32,
    /// Maximum cumulative rotation before giving up (degrees).
    pub budget_deg: f32,
}

impl Sweep {
    pub const fn new(speed: f32, step_secs: f32, budget_deg: f32) -> Self {
        Self {
            speed,
            step_secs,
            budget_deg,
        }
    }

    pub fn step(&self) -> Duration {
        duration_from_secs(self.step_secs)
    }

    /// Degrees covered by one increment.
    pub fn increment_deg(&self) -> f32 {
        self.speed.abs() * self.step_secs
    }

    /// Number of rotations a sweep that never finds anything performs.
    pub fn max_increments(&self) -> u32 {
        let increment = self.increment_deg();
        if self.budget_deg <= 0.0 || !(increment > 0.0) {
            return 0;
        }
        (self.budget_deg / increment).ceil() as u32
    }

    /// Same sweep in the opposite rotational sense.
    pub fn reversed(self) -> Self {
        Self {
            speed: -self.speed,
            ..self
        }
    }

    pub fn with_budget(self, budget_deg: f32) -> Self {
        Self { budget_deg, ..self }
    }

    /// Reject sweeps that could never advance or never finish.
    pub fn validate(&self, name: &str) -> Result<(), RetrieveError> {
        let increment = self.increment_deg();
        if !(self.step_secs.is_finite() && self.step_secs > 0.0) {
            return Err(RetrieveError::InvalidConfig(format!(
                "{name}.step_secs must be positive, got {}",
                self.step_secs
            )));
        }
        if !(increment.is_finite() && increment > 0.0) {
            return Err(RetrieveError::InvalidConfig(format!(
                "{name}.speed must be non-zero, got {}",
                self.speed
            )));
        }
        if !(self.budget_deg.is_finite() && self.budget_deg >= 0.0) {
            return Err(RetrieveError::InvalidConfig(format!(
                "{name}.budget_deg must be a non-negative number, got {}",
                self.budget_deg
            )));
        }
        let increments = (self.budget_deg / increment).ceil();
        if increments > MAX_INCREMENTS as f32 {
            return Err(RetrieveError::InvalidConfig(format!(
                "{name} needs {increments} increments to cover {}°, more than {MAX_INCREMENTS}",
                self.budget_deg
            )));
        }
        Ok(())
    }
}
