//! Generic `DriveBase` trait for a differential-drive robot with a gripper.
//!
//! Drivers implement this trait and are wrapped in a
//! [`Rover`][crate::rover::Rover].  The rest of the stack only ever talks to
//! the trait, so a simulator and a real motor board are interchangeable.

use std::time::Duration;

use retriever_types::RetrieveError;

/// Timed actuation backend.
///
/// `rotate` and `drive_straight` block the calling thread for `duration`;
/// `grasp` and `release` return as soon as the gripper has settled.
pub trait DriveBase {
    /// Spin in place.  Positive `speed` (degrees per second) turns clockwise.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::HardwareFault`] if the motors reject the
    /// command.
    fn rotate(&mut self, speed: f32, duration: Duration) -> Result<(), RetrieveError>;

    /// Drive straight.  Positive `speed` (metres per second) moves forward.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::HardwareFault`] if the motors reject the
    /// command.
    fn drive_straight(&mut self, speed: f32, duration: Duration) -> Result<(), RetrieveError>;

    /// Close the gripper.  `Ok(false)` means nothing was caught.
    fn grasp(&mut self) -> Result<bool, RetrieveError>;

    /// Open the gripper and drop whatever it holds.
    fn release(&mut self) -> Result<(), RetrieveError>;
}

/// A record of one actuation request, kept by the in-process backends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCommand {
    Rotate { speed: f32, duration: Duration },
    Drive { speed: f32, duration: Duration },
    Grasp,
    Release,
}

impl MotionCommand {
    /// Degrees swept by a rotation, signed by direction.  Zero otherwise.
    pub fn rotation_deg(&self) -> f32 {
        match self {
            MotionCommand::Rotate { speed, duration } => speed * duration.as_secs_f32(),
            _ => 0.0,
        }
    }

    /// Metres travelled by a straight drive, signed by direction.  Zero
    /// otherwise.
    pub fn travel_m(&self) -> f32 {
        match self {
            MotionCommand::Drive { speed, duration } => speed * duration.as_secs_f32(),
            _ => 0.0,
        }
    }
}
