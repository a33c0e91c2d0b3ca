//! `retriever-hal` – Hardware Abstraction Layer.
//!
//! The controller never talks to a camera or a motor driver directly.  It
//! talks to two narrow backend traits and to the [`Rover`] that wraps them.
//!
//! # Modules
//!
//! - [`perception`] – [`MarkerSensor`][perception::MarkerSensor]: one call to
//!   the marker-recognition backend returns the current set of detections.
//! - [`drive`] – [`DriveBase`][drive::DriveBase]: blocking timed rotate and
//!   straight-drive commands plus the gripper.
//! - [`rover`] – [`Rover`][rover::Rover]: the Perception Adapter and Motion
//!   Primitives the navigation layer drives, with per-run [`MotionStats`].
//! - [`sim`] – [`SimArena`][sim::SimArena] and
//!   [`ScriptedFeed`][sim::ScriptedFeed]: in-process backends for CI and
//!   tests, no physical robot required.

pub mod drive;
pub mod perception;
pub mod rover;
pub mod sim;

pub use drive::{DriveBase, MotionCommand};
pub use perception::MarkerSensor;
pub use rover::{MotionStats, Rover};
pub use sim::{ArenaConfig, ObjectSpec, Pose, ScriptedFeed, SimArena};
