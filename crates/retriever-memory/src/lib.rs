//! `retriever-memory` – mission state that outlives a single perception tick.
//!
//! # Modules
//!
//! - [`registry`] – [`TargetRegistry`][registry::TargetRegistry]: the
//!   order-preserving queue of discovered-but-unplaced markers and the list of
//!   markers already delivered to the rally point.

pub mod registry;

pub use registry::TargetRegistry;
