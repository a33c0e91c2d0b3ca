//! `retriever-types` – shared vocabulary of the retrieval stack.
//!
//! Every other crate speaks in terms of the types defined here: the
//! [`MarkerId`] that identifies a physical object, the instantaneous
//! [`Detection`] produced by one perception tick, the [`Thresholds`] that
//! decide when the robot has arrived, and the crate-wide [`RetrieveError`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier printed on an object's fiducial marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u32);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for MarkerId {
    fn from(code: u32) -> Self {
        MarkerId(code)
    }
}

/// One instantaneous reading of a marker relative to the robot.
///
/// Produced fresh by every perception call and never persisted.  A single
/// frame may contain several detections with the same [`MarkerId`]; callers
/// must treat that as noisy input rather than assume uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// The marker that was seen.
    pub marker: MarkerId,
    /// Straight-line distance from the robot (metres, ≥ 0).
    pub distance: f32,
    /// Angular offset from the robot heading (degrees).  Positive values lie
    /// clockwise, i.e. to the robot's right.
    pub bearing: f32,
}

impl Detection {
    pub fn new(marker: impl Into<MarkerId>, distance: f32, bearing: f32) -> Self {
        Self {
            marker: marker.into(),
            distance,
            bearing,
        }
    }

    /// `false` for readings a sane sensor cannot produce (NaN, infinities or a
    /// negative distance).
    pub fn is_well_formed(&self) -> bool {
        self.distance.is_finite() && self.bearing.is_finite() && self.distance >= 0.0
    }
}

/// Arrival tolerances for one approach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Maximum absolute bearing (degrees) before the robot turns to re-align.
    pub angle_deg: f32,
    /// The approach has arrived once the distance drops strictly below this.
    pub arrive_within: f32,
}

/// Alignment and arrival thresholds for a whole mission.
///
/// The rally distance only ever grows: [`Thresholds::widen_rally`] adds
/// `rally_increment` after each delivery to leave room for the objects that
/// are already crowding the rally point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Alignment tolerance (degrees).
    pub angle_deg: f32,
    /// Arrival tolerance when approaching an object to pick it up (metres).
    pub pickup_distance: f32,
    /// Initial arrival tolerance for the rally point (metres).
    pub rally_distance: f32,
    /// Amount added to the rally tolerance after each delivery (metres, ≥ 0).
    pub rally_increment: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            angle_deg: 2.0,
            pickup_distance: 0.4,
            rally_distance: 0.53,
            rally_increment: 0.1,
        }
    }
}

impl Thresholds {
    /// Tolerance used when approaching an object to grasp it.
    pub fn pickup(&self) -> Tolerance {
        Tolerance {
            angle_deg: self.angle_deg,
            arrive_within: self.pickup_distance,
        }
    }

    /// Tolerance used when carrying an object to the rally point.
    pub fn rally(&self) -> Tolerance {
        Tolerance {
            angle_deg: self.angle_deg,
            arrive_within: self.rally_distance,
        }
    }

    /// Grow the rally tolerance by one increment.  Negative increments are
    /// ignored so the tolerance never shrinks during a run.
    pub fn widen_rally(&mut self) {
        self.rally_distance += self.rally_increment.max(0.0);
    }

    /// Reject tolerances that would make every approach fail or never finish.
    pub fn validate(&self) -> Result<(), RetrieveError> {
        let positive = [
            ("angle_deg", self.angle_deg),
            ("pickup_distance", self.pickup_distance),
            ("rally_distance", self.rally_distance),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RetrieveError::InvalidConfig(format!(
                    "thresholds.{name} must be a positive number, got {value}"
                )));
            }
        }
        if !(self.rally_increment.is_finite() && self.rally_increment >= 0.0) {
            return Err(RetrieveError::InvalidConfig(format!(
                "thresholds.rally_increment must be non-negative, got {}",
                self.rally_increment
            )));
        }
        Ok(())
    }
}

/// Seconds from a config file to a [`Duration`].
///
/// Negative, NaN and out-of-range values collapse to [`Duration::ZERO`]
/// instead of panicking.
pub fn duration_from_secs(value: f32) -> Duration {
    if value > 0.0 {
        Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

/// Error type spanning mission-fatal conditions, actuator faults and
/// programming errors.
///
/// Recoverable situations (an object that cannot currently be found, a single
/// failed grasp) never surface here; they are handled where they are detected.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetrieveError {
    #[error("No markers were visible during the initial sweep; nothing to collect")]
    NothingToCollect,

    #[error("Registry precondition violated: marker {0} is not in the unplaced queue")]
    NotUnplaced(MarkerId),

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Grasp failed on marker {marker} after {attempts} attempt(s)")]
    GraspExhausted { marker: MarkerId, attempts: u32 },

    #[error("Rally point {0} could not be reached while holding an object")]
    RallyPointLost(MarkerId),

    #[error("Mission stalled: every remaining marker is unreachable ({} left)", .remaining.len())]
    Stalled { remaining: Vec<MarkerId> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
