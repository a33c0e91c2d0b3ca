//! `retriever-runtime` – the mission engine.
//!
//! Ties perception, navigation and the target registry together into one
//! single-threaded collection run.
//!
//! # Modules
//!
//! - [`config`] – [`MissionConfig`][config::MissionConfig]: every tunable of
//!   a run, validated before the robot moves.
//! - [`sequencer`] – [`MissionSequencer`][sequencer::MissionSequencer]:
//!   establishes the rally point, then collects and delivers markers in
//!   discovery order until the queue is empty.
//! - [`requeue_guard`] – [`RequeueGuard`][requeue_guard::RequeueGuard]:
//!   detects a queue in which nothing is reachable any more.
//! - [`report`] – [`MissionReport`][report::MissionReport]: serialisable
//!   summary of a finished run.
//! - [`metrics`] – [`append_elapsed`][metrics::append_elapsed]: the
//!   append-only run-time log.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console
//!   logging plus optional OTLP span export.

pub mod config;
pub mod metrics;
pub mod report;
pub mod requeue_guard;
pub mod sequencer;
pub mod telemetry;

pub use config::{BackoffConfig, MissionConfig};
pub use report::MissionReport;
pub use requeue_guard::RequeueGuard;
pub use sequencer::MissionSequencer;
pub use telemetry::{LogFormat, TelemetryConfig, TelemetryGuard, init_tracing};
