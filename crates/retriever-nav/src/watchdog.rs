//! [`Watchdog`] – wall-clock deadline for one approach.
//!
//! Angular budgets already bound every sweep, but a misbehaving backend can
//! still keep an approach alive far longer than intended (for instance a
//! target that stays visible while the robot never closes in).  The approach
//! controller starts one watchdog per invocation and gives up once it fires.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Watchdog {
    started: Instant,
    timeout: Duration,
}

impl Watchdog {
    /// Arm a watchdog that expires `timeout` from now.
    pub fn start(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `true` once strictly more than `timeout` has passed.
    pub fn is_expired(&self) -> bool {
        self.started.elapsed() > self.timeout
    }
}
