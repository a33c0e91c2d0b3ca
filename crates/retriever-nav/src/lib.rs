//! `retriever-nav` – perception-driven navigation.
//!
//! No map, no localisation: every decision is taken from the instantaneous
//! detection set, refreshed after each motion primitive.  Every search is a
//! bounded rotation so each routine is guaranteed to terminate.
//!
//! # Modules
//!
//! - [`sweep`] – [`Sweep`][sweep::Sweep]: a rotation plan (speed, step,
//!   angular budget) and its exact increment count.
//! - [`locator`] – [`locate`][locator::locate]: the Single-Target Locator.
//! - [`scanner`] – [`ClosestObjectScanner`][scanner::ClosestObjectScanner]:
//!   the three-pass oscillating sweep that picks the rally point.
//! - [`approach`] – [`ApproachController`][approach::ApproachController]:
//!   closed-loop align/drive toward one marker with three-stage recovery.
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]: wall-clock deadline
//!   for one approach.

pub mod approach;
pub mod locator;
pub mod scanner;
pub mod sweep;
pub mod watchdog;

pub use approach::{ApproachConfig, ApproachController, ApproachOutcome, ApproachReport, RecoveryConfig};
pub use locator::{Fix, Sighting, locate};
pub use scanner::{ClosestObjectScanner, ScannerConfig};
pub use sweep::Sweep;
pub use watchdog::Watchdog;
