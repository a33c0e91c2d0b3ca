//! [`Rover`] – Perception Adapter and Motion Primitives.
//!
//! Wraps a single backend that implements both [`MarkerSensor`] and
//! [`DriveBase`].  Every navigation routine goes through a `Rover`, which
//! gives one place to sanitise perception output, log every primitive, and
//! keep running [`MotionStats`].
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use retriever_hal::{Rover, ScriptedFeed};
//! use retriever_types::Detection;
//!
//! let feed = ScriptedFeed::new(vec![vec![Detection::new(3, 1.5, 4.0)]]);
//! let mut rover = Rover::new(feed);
//!
//! assert_eq!(rover.scan().len(), 1);
//! rover.turn(45.0, Duration::from_millis(20)).unwrap();
//! assert_eq!(rover.stats().rotations, 1);
//! ```

use std::time::Duration;

use retriever_types::{Detection, RetrieveError};
use tracing::{debug, warn};

use crate::drive::DriveBase;
use crate::perception::MarkerSensor;

/// Counters accumulated over the lifetime of a [`Rover`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionStats {
    /// Perception reads.
    pub scans: u64,
    /// Rotation primitives issued.
    pub rotations: u64,
    /// Straight-drive primitives issued.
    pub drives: u64,
    /// Sum of signed commanded rotation (degrees, clockwise positive).
    pub net_rotation_deg: f32,
    /// Sum of signed commanded travel (metres, forward positive).
    pub net_travel_m: f32,
    pub grasps: u64,
    pub releases: u64,
}

/// The robot as seen by the navigation layer.
pub struct Rover<B> {
    backend: B,
    stats: MotionStats,
}

impl<B: MarkerSensor + DriveBase> Rover<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            stats: MotionStats::default(),
        }
    }

    /// Borrow the backend, e.g. to inspect a simulator after a run.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn stats(&self) -> MotionStats {
        self.stats
    }

    /// Read the instantaneous detection set.
    ///
    /// Malformed readings (non-finite values, negative distance) are dropped.
    /// Duplicate markers are kept; ranking them is the caller's business.
    pub fn scan(&mut self) -> Vec<Detection> {
        self.stats.scans += 1;
        let mut frame = self.backend.see();
        frame.retain(|d| {
            let ok = d.is_well_formed();
            if !ok {
                warn!(marker = %d.marker, distance = d.distance, bearing = d.bearing, "dropping malformed detection");
            }
            ok
        });
        debug!(visible = frame.len(), "scan");
        frame
    }

    /// Rotate in place for `step`.  Positive `speed` turns clockwise.
    pub fn turn(&mut self, speed: f32, step: Duration) -> Result<(), RetrieveError> {
        debug!(speed, step_ms = step.as_millis() as u64, "turn");
        self.backend.rotate(speed, step)?;
        self.stats.rotations += 1;
        self.stats.net_rotation_deg += speed * step.as_secs_f32();
        Ok(())
    }

    /// Drive straight for `step`.  Negative `speed` backs up.
    pub fn drive(&mut self, speed: f32, step: Duration) -> Result<(), RetrieveError> {
        debug!(speed, step_ms = step.as_millis() as u64, "drive");
        self.backend.drive_straight(speed, step)?;
        self.stats.drives += 1;
        self.stats.net_travel_m += speed * step.as_secs_f32();
        Ok(())
    }

    /// Close the gripper.  Returns whether an object was acquired.
    pub fn grasp(&mut self) -> Result<bool, RetrieveError> {
        let caught = self.backend.grasp()?;
        self.stats.grasps += 1;
        debug!(caught, "grasp");
        Ok(caught)
    }

    pub fn release(&mut self) -> Result<(), RetrieveError> {
        self.backend.release()?;
        self.stats.releases += 1;
        debug!("release");
        Ok(())
    }
}
