//! Approach Controller.
//!
//! Drives the robot toward one marker until it is within the arrival
//! tolerance.  Per invocation:
//!
//! ```text
//!   LOCATING ──coarse sweep──► found? ──no──► NotFound
//!                                │
//!                               yes
//!                                ▼
//!        ┌──► ALIGNING / APPROACHING (one corrective step)
//!        │                       │
//!        │              fine re-acquisition
//!        │                       │
//!        │           found ◄─────┴─────► LOST ── 3 recovery sweeps ──► NotFound
//!        │             │                               │
//!        └─────────────┘◄──────────── found ───────────┘
//!                      │
//!            distance < arrive_within ──► Arrived
//! ```
//!
//! Every frame read by any sweep is handed to the [`TargetRegistry`], so
//! markers that come into view while the robot is moving are discovered
//! without a dedicated stop-and-scan.  The first frame of each fine
//! re-acquisition is read right after the corrective step, which makes it
//! the post-step observation.
//!
//! Besides the angular budgets, each invocation is bounded by a corrective
//! step cap and a wall-clock [`Watchdog`].  Hitting either ends the approach
//! as `NotFound`.

use std::time::Duration;

use retriever_hal::{DriveBase, MarkerSensor, Rover};
use retriever_memory::TargetRegistry;
use retriever_types::{Detection, MarkerId, RetrieveError, Tolerance, duration_from_secs};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::locator::{Fix, Sighting, locate};
use crate::sweep::Sweep;
use crate::watchdog::Watchdog;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// The three escalating sweeps run when a tracked target disappears.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub speed: f32,
    pub step_secs: f32,
    /// Budgets B1 (forward), B2 (reverse), B3 (forward), in degrees.
    pub budgets_deg: [f32; 3],
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            speed: 45.0,
            step_secs: 0.02,
            budgets_deg: [30.0, 60.0, 30.0],
        }
    }
}

impl RecoveryConfig {
    /// Forward B1, reverse B2, forward B3.
    pub fn stages(&self) -> [Sweep; 3] {
        let forward = Sweep::new(self.speed, self.step_secs, 0.0);
        let [b1, b2, b3] = self.budgets_deg;
        [
            forward.with_budget(b1),
            forward.reversed().with_budget(b2),
            forward.with_budget(b3),
        ]
    }

    pub fn validate(&self) -> Result<(), RetrieveError> {
        for (i, stage) in self.stages().iter().enumerate() {
            stage.validate(&format!("approach.recovery.stage{}", i + 1))?;
        }
        let [b1, b2, _] = self.budgets_deg;
        if b2 <= b1 {
            return Err(RetrieveError::InvalidConfig(format!(
                "approach.recovery: the reverse budget ({b2}) must exceed the first forward budget ({b1})"
            )));
        }
        Ok(())
    }
}

/// Tuning of the closed loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproachConfig {
    /// Initial full-rotation sweep.
    pub coarse: Sweep,
    /// Short re-acquisition sweep after every corrective step.
    pub fine: Sweep,
    pub recovery: RecoveryConfig,
    /// Alignment turn speed (degrees per second).
    pub align_speed: f32,
    pub align_step_secs: f32,
    /// Forward drive speed (metres per second).
    pub drive_speed: f32,
    pub drive_step_secs: f32,
    pub max_corrective_steps: u32,
    pub timeout_secs: f32,
}

impl Default for ApproachConfig {
    fn default() -> Self {
        Self {
            coarse: Sweep::new(45.0, 0.05, 360.0),
            fine: Sweep::new(45.0, 0.02, 3.0),
            recovery: RecoveryConfig::default(),
            align_speed: 15.0,
            align_step_secs: 0.05,
            drive_speed: 0.5,
            drive_step_secs: 0.1,
            max_corrective_steps: 4000,
            timeout_secs: 120.0,
        }
    }
}

impl ApproachConfig {
    pub fn timeout(&self) -> Duration {
        duration_from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), RetrieveError> {
        self.coarse.validate("approach.coarse")?;
        self.fine.validate("approach.fine")?;
        self.recovery.validate()?;
        let positive = [
            ("align_speed", self.align_speed),
            ("align_step_secs", self.align_step_secs),
            ("drive_speed", self.drive_speed),
            ("drive_step_secs", self.drive_step_secs),
            ("timeout_secs", self.timeout_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RetrieveError::InvalidConfig(format!(
                    "approach.{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.max_corrective_steps == 0 {
            return Err(RetrieveError::InvalidConfig(
                "approach.max_corrective_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcome
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApproachOutcome {
    /// Within the arrival tolerance of the target.
    Arrived,
    /// The target could not be (re)located; the caller decides what next.
    NotFound,
}

/// What one [`ApproachController::approach`] call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproachReport {
    pub outcome: ApproachOutcome,
    /// Alignment turns plus forward drive steps.
    pub corrective_steps: u32,
    /// Recovery sweeps run across all loss events of this approach.
    pub recovery_sweeps: u32,
    pub elapsed: Duration,
}

impl ApproachReport {
    pub fn arrived(&self) -> bool {
        self.outcome == ApproachOutcome::Arrived
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ApproachController
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ApproachController {
    config: ApproachConfig,
}

impl ApproachController {
    pub fn new(config: ApproachConfig) -> Self {
        Self { config }
    }

    /// Close in on `target` until `distance < tolerance.arrive_within`.
    ///
    /// # Errors
    ///
    /// Only actuator faults.  An unreachable target is reported as
    /// [`ApproachOutcome::NotFound`], not as an error.
    #[instrument(skip(self, rover, registry, tolerance), fields(target = %target))]
    pub fn approach<B>(
        &self,
        rover: &mut Rover<B>,
        registry: &mut TargetRegistry,
        target: MarkerId,
        tolerance: Tolerance,
    ) -> Result<ApproachReport, RetrieveError>
    where
        B: MarkerSensor + DriveBase,
    {
        let watchdog = Watchdog::start(self.config.timeout());
        let mut steps = 0_u32;
        let mut sweeps = 0_u32;
        let finish = |outcome: ApproachOutcome, steps: u32, sweeps: u32| ApproachReport {
            outcome,
            corrective_steps: steps,
            recovery_sweeps: sweeps,
            elapsed: watchdog.elapsed(),
        };

        let mut fix = match locate(rover, target, self.config.coarse, |f: &[Detection]| {
            registry.observe(f);
        })? {
            Sighting::Found(fix) => fix,
            Sighting::NotFound => {
                warn!("target not visible from here");
                return Ok(finish(ApproachOutcome::NotFound, steps, sweeps));
            }
        };

        while fix.distance >= tolerance.arrive_within {
            if steps >= self.config.max_corrective_steps {
                warn!(steps, distance = fix.distance, "corrective step cap reached, giving up");
                return Ok(finish(ApproachOutcome::NotFound, steps, sweeps));
            }
            if watchdog.is_expired() {
                warn!(
                    timeout_s = watchdog.timeout().as_secs_f32(),
                    distance = fix.distance,
                    "approach watchdog expired, giving up"
                );
                return Ok(finish(ApproachOutcome::NotFound, steps, sweeps));
            }

            self.correct(rover, fix, tolerance)?;
            steps += 1;

            fix = match locate(rover, target, self.config.fine, |f: &[Detection]| {
                registry.observe(f);
            })? {
                Sighting::Found(fix) => fix,
                Sighting::NotFound => {
                    warn!("target no longer visible, searching");
                    match self.recover(rover, registry, target, &mut sweeps)? {
                        Some(fix) => fix,
                        None => {
                            warn!(sweeps, "recovery failed");
                            return Ok(finish(ApproachOutcome::NotFound, steps, sweeps));
                        }
                    }
                }
            };
        }

        debug!(steps, sweeps, distance = fix.distance, "arrived");
        Ok(finish(ApproachOutcome::Arrived, steps, sweeps))
    }

    /// One alignment turn or one forward step.
    fn correct<B>(&self, rover: &mut Rover<B>, fix: Fix, tolerance: Tolerance) -> Result<(), RetrieveError>
    where
        B: MarkerSensor + DriveBase,
    {
        let c = &self.config;
        if fix.bearing < -tolerance.angle_deg {
            rover.turn(-c.align_speed, duration_from_secs(c.align_step_secs))
        } else if fix.bearing > tolerance.angle_deg {
            rover.turn(c.align_speed, duration_from_secs(c.align_step_secs))
        } else {
            rover.drive(c.drive_speed, duration_from_secs(c.drive_step_secs))
        }
    }

    fn recover<B>(
        &self,
        rover: &mut Rover<B>,
        registry: &mut TargetRegistry,
        target: MarkerId,
        sweeps: &mut u32,
    ) -> Result<Option<Fix>, RetrieveError>
    where
        B: MarkerSensor + DriveBase,
    {
        for (stage, sweep) in self.config.recovery.stages().into_iter().enumerate() {
            *sweeps += 1;
            let sighting = locate(rover, target, sweep, |f: &[Detection]| {
                registry.observe(f);
            })?;
            if let Sighting::Found(fix) = sighting {
                info!(%target, stage = stage + 1, "found target again");
                return Ok(Some(fix));
            }
        }
        Ok(None)
    }
}
