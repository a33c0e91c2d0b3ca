//! Single-Target Locator.
//!
//! Looks for one marker by rotating in small increments and checking the live
//! detection set before the first turn and after every turn.  The first
//! detection carrying the target's id is authoritative, even if the frame
//! lists the marker twice.
//!
//! The locator does no bookkeeping of its own for other markers.  Callers
//! that want continuous discovery pass an `on_frame` hook, which sees every
//! frame the locator reads.

use retriever_hal::{DriveBase, MarkerSensor, Rover};
use retriever_types::{Detection, MarkerId, RetrieveError};
use tracing::{debug, instrument};

use crate::sweep::Sweep;

/// Where the target was seen, relative to the robot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub distance: f32,
    pub bearing: f32,
}

impl From<&Detection> for Fix {
    fn from(d: &Detection) -> Self {
        Self {
            distance: d.distance,
            bearing: d.bearing,
        }
    }
}

/// Result of one [`locate`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sighting {
    Found(Fix),
    NotFound,
}

/// Sweep for `target` within `sweep`'s angular budget.
///
/// Performs at most [`Sweep::max_increments`] rotations and
/// `max_increments + 1` perception reads.
///
/// # Errors
///
/// Only actuator faults from the rotation primitive.
#[instrument(level = "debug", skip(rover, on_frame), fields(target = %target))]
pub fn locate<B, F>(
    rover: &mut Rover<B>,
    target: MarkerId,
    sweep: Sweep,
    mut on_frame: F,
) -> Result<Sighting, RetrieveError>
where
    B: MarkerSensor + DriveBase,
    F: FnMut(&[Detection]),
{
    let turns = sweep.max_increments();
    let step = sweep.step();
    let mut swept_deg = 0.0_f32;

    for turn in 0..=turns {
        let frame = rover.scan();
        on_frame(&frame);
        if let Some(detection) = frame.iter().find(|d| d.marker == target) {
            debug!(
                distance = detection.distance,
                bearing = detection.bearing,
                swept_deg,
                "target located"
            );
            return Ok(Sighting::Found(Fix::from(detection)));
        }
        if turn == turns {
            break;
        }
        rover.turn(sweep.speed, step)?;
        swept_deg += sweep.increment_deg();
    }

    debug!(swept_deg, "target not found within budget");
    Ok(Sighting::NotFound)
}
