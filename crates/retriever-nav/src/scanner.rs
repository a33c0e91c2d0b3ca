//! Closest-Object Scanner.
//!
//! Used once per mission to choose the rally point.  The robot oscillates
//! around its starting heading in three passes:
//!
//! ```text
//!   pass 1:  +θ   (turn clockwise)
//!   pass 2:  −2θ  (back through neutral to θ past it on the other side)
//!   pass 3:  +θ   (return to the starting heading)
//! ```
//!
//! Each pass is counted in whole increments (`n`, `2n`, `n` with
//! `n = ceil(θ / increment)`), so the net commanded rotation is exactly zero.
//! Every frame read along the way feeds the [`TargetRegistry`] and is
//! compared against the running minimum distance; a strictly smaller distance
//! replaces the candidate, so ties keep the first marker seen.

use retriever_hal::{DriveBase, MarkerSensor, Rover};
use retriever_memory::TargetRegistry;
use retriever_memory::registry::MarkerStatus;
use retriever_types::{Detection, RetrieveError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::sweep::Sweep;

/// Sweep geometry of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Turn speed (degrees per second, positive starts clockwise).
    pub speed: f32,
    /// Duration of one increment (seconds).
    pub step_secs: f32,
    /// Angular budget θ on each side of the starting heading (degrees).
    pub half_arc_deg: f32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            speed: 45.0,
            step_secs: 0.05,
            half_arc_deg: 90.0,
        }
    }
}

impl ScannerConfig {
    fn sweep(&self) -> Sweep {
        Sweep::new(self.speed, self.step_secs, self.half_arc_deg)
    }

    /// # Errors
    ///
    /// [`RetrieveError::InvalidConfig`] for a sweep that cannot advance, or a
    /// half arc beyond a full turn.
    pub fn validate(&self) -> Result<(), RetrieveError> {
        self.sweep().validate("scanner")?;
        if self.half_arc_deg > 360.0 {
            return Err(RetrieveError::InvalidConfig(format!(
                "scanner.half_arc_deg must be at most 360, got {}",
                self.half_arc_deg
            )));
        }
        Ok(())
    }

    /// `(speed, increments)` for the three passes.
    pub fn passes(&self) -> [(f32, u32); 3] {
        let n = self.sweep().max_increments();
        [(self.speed, n), (-self.speed, n.saturating_mul(2)), (self.speed, n)]
    }
}

/// Finds the nearest marker around the robot without changing its heading.
#[derive(Debug, Clone)]
pub struct ClosestObjectScanner {
    config: ScannerConfig,
}

impl ClosestObjectScanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Run the three-pass sweep.
    ///
    /// Returns the nearest detection seen at any point of the sweep, or `None`
    /// if not a single unplaced marker was ever visible.
    #[instrument(skip_all)]
    pub fn scan<B>(
        &self,
        rover: &mut Rover<B>,
        registry: &mut TargetRegistry,
    ) -> Result<Option<Detection>, RetrieveError>
    where
        B: MarkerSensor + DriveBase,
    {
        let step = self.config.sweep().step();
        let mut nearest: Option<Detection> = None;

        absorb(&rover.scan(), registry, &mut nearest);
        for (pass, (speed, increments)) in self.config.passes().into_iter().enumerate() {
            for _ in 0..increments {
                rover.turn(speed, step)?;
                absorb(&rover.scan(), registry, &mut nearest);
            }
            debug!(pass = pass + 1, increments, "scanner pass complete");
        }

        match &nearest {
            Some(d) => info!(marker = %d.marker, distance = d.distance, "closest marker found"),
            None => info!("no markers seen during the sweep"),
        }
        Ok(nearest)
    }
}

fn absorb(frame: &[Detection], registry: &mut TargetRegistry, nearest: &mut Option<Detection>) {
    registry.observe(frame);
    for detection in frame {
        if registry.status(detection.marker) == MarkerStatus::Placed {
            continue;
        }
        if nearest.is_none_or(|n| detection.distance < n.distance) {
            *nearest = Some(*detection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retriever_hal::{MotionCommand, ScriptedFeed, SimArena};
    use retriever_types::MarkerId;

    fn config() -> ScannerConfig {
        // 2.25° per increment, 4 increments per side.
        ScannerConfig {
            speed: 45.0,
            step_secs: 0.05,
            half_arc_deg: 9.0,
        }
    }

    #[test]
    fn empty_arena_yields_none_after_three_passes() {
        let mut rover = Rover::new(ScriptedFeed::new(vec![]));
        let mut registry = TargetRegistry::new();
        let result = ClosestObjectScanner::new(config()).scan(&mut rover, &mut registry).unwrap();

        assert_eq!(result, None);
        assert_eq!(rover.stats().rotations, 4 + 8 + 4);
        assert!(rover.stats().net_rotation_deg.abs() < 1e-3);
        assert!(registry.is_complete());
    }

    #[test]
    fn pass_directions_alternate() {
        let mut rover = Rover::new(ScriptedFeed::new(vec![]));
        ClosestObjectScanner::new(config())
            .scan(&mut rover, &mut TargetRegistry::new())
            .unwrap();
        let signs: Vec<bool> = rover
            .backend()
            .commands()
            .iter()
            .map(|c| matches!(c, MotionCommand::Rotate { speed, .. } if *speed > 0.0))
            .collect();
        assert!(signs[..4].iter().all(|s| *s));
        assert!(signs[4..12].iter().all(|s| !*s));
        assert!(signs[12..].iter().all(|s| *s));
    }

    #[test]
    fn nearest_over_the_whole_sweep_wins() {
        let frames = vec![
            vec![Detection::new(1, 3.0, 0.0), Detection::new(2, 1.5, 10.0)],
            vec![Detection::new(3, 2.0, -5.0)],
            vec![],
            vec![Detection::new(2, 1.0, 3.0)],
        ];
        let mut rover = Rover::new(ScriptedFeed::new(frames));
        let mut registry = TargetRegistry::new();
        let best = ClosestObjectScanner::new(config())
            .scan(&mut rover, &mut registry)
            .unwrap()
            .unwrap();

        assert_eq!(best.marker, MarkerId(2));
        assert!((best.distance - 1.0).abs() < 1e-6);
        // Every marker seen during the sweep is now queued, in discovery order.
        assert_eq!(
            registry.unplaced().collect::<Vec<_>>(),
            vec![MarkerId(1), MarkerId(2), MarkerId(3)]
        );
    }

    #[test]
    fn ties_go_to_the_first_marker_seen() {
        let frames = vec![
            vec![Detection::new(5, 1.0, 0.0)],
            vec![Detection::new(4, 1.0, 0.0)],
        ];
        let mut rover = Rover::new(ScriptedFeed::new(frames));
        let best = ClosestObjectScanner::new(config())
            .scan(&mut rover, &mut TargetRegistry::new())
            .unwrap()
            .unwrap();
        assert_eq!(best.marker, MarkerId(5));
    }

    #[test]
    fn duplicate_readings_rank_by_nearest_instance() {
        let frames = vec![vec![
            Detection::new(8, 2.0, 0.0),
            Detection::new(9, 1.0, 0.0),
            Detection::new(8, 0.5, 1.0),
        ]];
        let mut rover = Rover::new(ScriptedFeed::new(frames));
        let best = ClosestObjectScanner::new(config())
            .scan(&mut rover, &mut TargetRegistry::new())
            .unwrap()
            .unwrap();
        assert_eq!(best.marker, MarkerId(8));
        assert!((best.distance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn placed_markers_are_not_candidates() {
        let mut registry = TargetRegistry::new();
        registry.observe(&[Detection::new(1, 0.2, 0.0)]);
        registry.choose_rally_point(MarkerId(1)).unwrap();

        let frames = vec![vec![Detection::new(1, 0.2, 0.0), Detection::new(2, 2.0, 0.0)]];
        let mut rover = Rover::new(ScriptedFeed::new(frames));
        let best = ClosestObjectScanner::new(config())
            .scan(&mut rover, &mut registry)
            .unwrap()
            .unwrap();
        assert_eq!(best.marker, MarkerId(2));
    }

    #[test]
    fn sweep_covers_both_sides_and_restores_heading() {
        // One marker ahead-left outside the initial view, one far right.
        let mut rover = Rover::new(SimArena::polar(&[(1, 2.5, -80.0), (2, 1.2, 100.0), (3, 3.0, 0.0)]));
        let mut registry = TargetRegistry::new();
        let best = ClosestObjectScanner::new(ScannerConfig::default())
            .scan(&mut rover, &mut registry)
            .unwrap()
            .unwrap();

        assert_eq!(best.marker, MarkerId(2));
        assert_eq!(registry.unplaced_len(), 3);
        let heading = rover.backend().pose().heading_deg;
        assert!(heading < 1e-2 || heading > 360.0 - 1e-2, "heading was {heading}");
    }

    #[test]
    fn oversized_half_arc_is_rejected() {
        let huge = ScannerConfig {
            speed: 1.0,
            step_secs: 0.001,
            half_arc_deg: 1e7,
        };
        assert!(matches!(huge.validate(), Err(RetrieveError::InvalidConfig(_))));

        let wide = ScannerConfig {
            half_arc_deg: 400.0,
            ..ScannerConfig::default()
        };
        let err = wide.validate().unwrap_err();
        assert!(err.to_string().contains("half_arc_deg"));

        let full_turn = ScannerConfig {
            half_arc_deg: 360.0,
            ..ScannerConfig::default()
        };
        assert!(full_turn.validate().is_ok());
        assert_eq!(full_turn.passes()[1].1, 2 * full_turn.passes()[0].1);
    }

    #[test]
    fn passes_never_overflow() {
        let huge = ScannerConfig {
            speed: 1.0,
            step_secs: 0.001,
            half_arc_deg: 1e7,
        };
        let [(_, first), (_, second), _] = huge.passes();
        assert_eq!(second, first.saturating_mul(2));
    }
}
