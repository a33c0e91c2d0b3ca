//! In-process backends for CI/CD testing without a physical robot.
//!
//! # Backends
//!
//! | Backend | Behaviour |
//! |---|---|
//! | [`SimArena`] | Kinematic 2-D arena: rotations and drives move the robot, the camera reports every marker inside its field of view, the gripper catches the nearest marker right in front. |
//! | [`ScriptedFeed`] | Replays a fixed list of detection frames (the last frame repeats forever) and records every command. |
//!
//! # Limitations
//!
//! [`DriveBase::grasp`] carries no marker id, so the arena's gripper takes
//! whichever marker is nearest inside its cone.  When two markers sit within
//! `grasp_range` of each other the robot may pick up a different one than it
//! approached, and the mission records the approached one as delivered.
//!
//! # Arena frame
//!
//! Positions are metres on a flat floor.  Headings are compass-style
//! degrees: `0` faces `+y`, positive angles turn clockwise.  A marker's
//! bearing is therefore positive when it lies to the robot's right, which is
//! the convention the navigation layer expects.
//!
//! # Example
//!
//! ```rust
//! use retriever_hal::{MarkerSensor, SimArena};
//!
//! // One marker 1.5 m straight ahead, another 2 m away 20° to the right.
//! let mut arena = SimArena::polar(&[(1, 1.5, 0.0), (2, 2.0, 20.0)]);
//! let frame = arena.see();
//! assert_eq!(frame.len(), 2);
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use retriever_types::{Detection, MarkerId, RetrieveError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::drive::{DriveBase, MotionCommand};
use crate::perception::MarkerSensor;

// ────────────────────────────────────────────────────────────────────────────
// Arena description
// ────────────────────────────────────────────────────────────────────────────

/// Robot pose in the arena frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    /// Compass heading in degrees (clockwise from `+y`).
    pub heading_deg: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, heading_deg: f32) -> Self {
        Self { x, y, heading_deg }
    }
}

/// A marker placed somewhere on the floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub marker: MarkerId,
    pub x: f32,
    pub y: f32,
}

/// Static arena layout and sensor/gripper geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub start: Pose,
    pub objects: Vec<ObjectSpec>,
    /// Full horizontal field of view of the camera (degrees).
    pub fov_deg: f32,
    /// Maximum distance at which a marker is recognised (metres).
    pub range: f32,
    /// The gripper reaches this far (metres).
    pub grasp_range: f32,
    /// Half-angle of the cone in front of the gripper (degrees).
    pub grasp_cone_deg: f32,
    /// Distance in front of the robot where a released object lands (metres).
    pub release_offset: f32,
    /// Sleep for the commanded duration of every motion, like real motors.
    pub realtime: bool,
}

/// Radius of the token circle in the reference arena.
const TOKEN_CIRCLE_RADIUS: f32 = 2.4;

impl Default for ArenaConfig {
    /// The reference layout: a 5.75 m square arena, the robot in the
    /// south-west corner facing the centre, six markers (codes 6–11) on a
    /// 2.4 m circle around the centre.
    fn default() -> Self {
        let angles = [20.0_f32, 75.0, 140.0, 200.0, 255.0, 320.0];
        let objects = angles
            .iter()
            .enumerate()
            .map(|(i, deg)| {
                let rad = deg.to_radians();
                ObjectSpec {
                    marker: MarkerId(6 + i as u32),
                    x: TOKEN_CIRCLE_RADIUS * rad.cos(),
                    y: TOKEN_CIRCLE_RADIUS * rad.sin(),
                }
            })
            .collect();
        Self {
            start: Pose::new(-2.6, -2.6, 45.0),
            objects,
            fov_deg: 70.0,
            range: 8.0,
            grasp_range: 0.45,
            grasp_cone_deg: 10.0,
            release_offset: 0.25,
            realtime: false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimArena
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SimObject {
    marker: MarkerId,
    x: f32,
    y: f32,
}

/// A simulated arena implementing both [`MarkerSensor`] and [`DriveBase`].
#[derive(Debug, Clone)]
pub struct SimArena {
    config: ArenaConfig,
    pose: Pose,
    objects: Vec<SimObject>,
    held: Option<SimObject>,
    travelled: f32,
    /// Markers that disappear for good once `travelled` exceeds the distance.
    vanishing: Vec<(MarkerId, f32)>,
    failing_grasps: u32,
    commands: Vec<MotionCommand>,
}

impl SimArena {
    pub fn new(config: ArenaConfig) -> Self {
        let objects = config
            .objects
            .iter()
            .map(|o| SimObject {
                marker: o.marker,
                x: o.x,
                y: o.y,
            })
            .collect();
        Self {
            pose: config.start,
            config,
            objects,
            held: None,
            travelled: 0.0,
            vanishing: Vec::new(),
            failing_grasps: 0,
            commands: Vec::new(),
        }
    }

    /// Arena with the robot at the origin facing `+y` and markers placed by
    /// `(code, distance, bearing_deg)` relative to that start pose.  Camera
    /// and gripper geometry come from [`ArenaConfig::default`].
    pub fn polar(markers: &[(u32, f32, f32)]) -> Self {
        let objects = markers
            .iter()
            .map(|&(code, distance, bearing)| {
                let rad = bearing.to_radians();
                ObjectSpec {
                    marker: MarkerId(code),
                    x: distance * rad.sin(),
                    y: distance * rad.cos(),
                }
            })
            .collect();
        Self::new(ArenaConfig {
            start: Pose::new(0.0, 0.0, 0.0),
            objects,
            ..ArenaConfig::default()
        })
    }

    /// Make the next `n` grasps fail regardless of geometry.
    pub fn fail_next_grasps(&mut self, n: u32) {
        self.failing_grasps = n;
    }

    /// Remove `marker` from the arena permanently once the robot has driven
    /// a total of `metres` (forward and backward both count).
    pub fn vanish_after_travel(&mut self, marker: MarkerId, metres: f32) {
        self.vanishing.push((marker, metres));
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn held(&self) -> Option<MarkerId> {
        self.held.as_ref().map(|o| o.marker)
    }

    pub fn commands(&self) -> &[MotionCommand] {
        &self.commands
    }

    /// Floor position of a marker that is not currently carried.
    pub fn position_of(&self, marker: MarkerId) -> Option<(f32, f32)> {
        self.objects
            .iter()
            .find(|o| o.marker == marker)
            .map(|o| (o.x, o.y))
    }

    /// Euclidean distance between two markers lying on the floor.
    pub fn separation(&self, a: MarkerId, b: MarkerId) -> Option<f32> {
        let (ax, ay) = self.position_of(a)?;
        let (bx, by) = self.position_of(b)?;
        Some((ax - bx).hypot(ay - by))
    }

    /// Distance and bearing of a floor point as seen from the robot.
    fn relative(&self, x: f32, y: f32) -> (f32, f32) {
        let dx = x - self.pose.x;
        let dy = y - self.pose.y;
        let azimuth = dx.atan2(dy).to_degrees();
        (dx.hypot(dy), wrap_180(azimuth - self.pose.heading_deg))
    }

    fn apply_vanishing(&mut self) {
        let travelled = self.travelled;
        let gone: Vec<MarkerId> = self
            .vanishing
            .iter()
            .filter(|(_, after)| travelled >= *after)
            .map(|(m, _)| *m)
            .collect();
        if gone.is_empty() {
            return;
        }
        self.objects.retain(|o| !gone.contains(&o.marker));
        self.vanishing.retain(|(m, _)| !gone.contains(m));
        for marker in gone {
            info!(%marker, "sim: marker removed from arena");
        }
    }

    fn pause(&self, duration: Duration) {
        if self.config.realtime {
            std::thread::sleep(duration);
        }
    }
}

impl MarkerSensor for SimArena {
    fn see(&mut self) -> Vec<Detection> {
        self.apply_vanishing();
        let half_fov = self.config.fov_deg / 2.0;
        self.objects
            .iter()
            .filter_map(|o| {
                let (distance, bearing) = self.relative(o.x, o.y);
                (distance <= self.config.range && bearing.abs() <= half_fov)
                    .then(|| Detection::new(o.marker, distance, bearing))
            })
            .collect()
    }
}

impl DriveBase for SimArena {
    fn rotate(&mut self, speed: f32, duration: Duration) -> Result<(), RetrieveError> {
        let command = MotionCommand::Rotate { speed, duration };
        self.pose.heading_deg = wrap_360(self.pose.heading_deg + command.rotation_deg());
        self.commands.push(command);
        self.pause(duration);
        Ok(())
    }

    fn drive_straight(&mut self, speed: f32, duration: Duration) -> Result<(), RetrieveError> {
        let command = MotionCommand::Drive { speed, duration };
        let metres = command.travel_m();
        let heading = self.pose.heading_deg.to_radians();
        self.pose.x += metres * heading.sin();
        self.pose.y += metres * heading.cos();
        self.travelled += metres.abs();
        self.commands.push(command);
        self.pause(duration);
        Ok(())
    }

    /// Catch the nearest marker in reach, regardless of which one the robot
    /// was approaching.
    fn grasp(&mut self) -> Result<bool, RetrieveError> {
        self.commands.push(MotionCommand::Grasp);
        if self.held.is_some() {
            return Ok(false);
        }
        if self.failing_grasps > 0 {
            self.failing_grasps -= 1;
            debug!("sim: injected grasp failure");
            return Ok(false);
        }
        self.apply_vanishing();
        let reach = self.config.grasp_range;
        let cone = self.config.grasp_cone_deg;
        let nearest = self
            .objects
            .iter()
            .enumerate()
            .filter_map(|(i, o)| {
                let (distance, bearing) = self.relative(o.x, o.y);
                (distance <= reach && bearing.abs() <= cone).then_some((i, distance))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i);
        match nearest {
            Some(i) => {
                let object = self.objects.remove(i);
                debug!(marker = %object.marker, "sim: grasped");
                self.held = Some(object);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn release(&mut self) -> Result<(), RetrieveError> {
        self.commands.push(MotionCommand::Release);
        if let Some(mut object) = self.held.take() {
            let heading = self.pose.heading_deg.to_radians();
            object.x = self.pose.x + self.config.release_offset * heading.sin();
            object.y = self.pose.y + self.config.release_offset * heading.cos();
            debug!(marker = %object.marker, x = object.x, y = object.y, "sim: released");
            self.objects.push(object);
        }
        Ok(())
    }
}

fn wrap_180(deg: f32) -> f32 {
    let d = deg.rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

fn wrap_360(deg: f32) -> f32 {
    deg.rem_euclid(360.0)
}

// ────────────────────────────────────────────────────────────────────────────
// ScriptedFeed
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic backend that replays detection frames.
///
/// Each [`MarkerSensor::see`] call pops the next frame; once the script is
/// exhausted the last frame is repeated (an empty script always reports
/// nothing).  Motion commands have no effect on the feed and are only
/// recorded.  Grasps succeed unless [`ScriptedFeed::with_grasps`] scripted
/// otherwise.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFeed {
    frames: VecDeque<Vec<Detection>>,
    last: Vec<Detection>,
    grasps: VecDeque<bool>,
    commands: Vec<MotionCommand>,
    reads: usize,
}

impl ScriptedFeed {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            frames: frames.into(),
            ..Self::default()
        }
    }

    /// Script the outcome of upcoming grasps, in order.
    pub fn with_grasps(mut self, results: impl IntoIterator<Item = bool>) -> Self {
        self.grasps.extend(results);
        self
    }

    pub fn commands(&self) -> &[MotionCommand] {
        &self.commands
    }

    /// Number of frames handed out so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl MarkerSensor for ScriptedFeed {
    fn see(&mut self) -> Vec<Detection> {
        self.reads += 1;
        if let Some(frame) = self.frames.pop_front() {
            self.last = frame;
        }
        self.last.clone()
    }
}

impl DriveBase for ScriptedFeed {
    fn rotate(&mut self, speed: f32, duration: Duration) -> Result<(), RetrieveError> {
        self.commands.push(MotionCommand::Rotate { speed, duration });
        Ok(())
    }

    fn drive_straight(&mut self, speed: f32, duration: Duration) -> Result<(), RetrieveError> {
        self.commands.push(MotionCommand::Drive { speed, duration });
        Ok(())
    }

    fn grasp(&mut self) -> Result<bool, RetrieveError> {
        self.commands.push(MotionCommand::Grasp);
        Ok(self.grasps.pop_front().unwrap_or(true))
    }

    fn release(&mut self) -> Result<(), RetrieveError> {
        self.commands.push(MotionCommand::Release);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
