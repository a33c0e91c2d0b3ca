//! [`MissionSequencer`] – the top-level collection loop.
//!
//! ```text
//!   scan for the closest marker ──► rally point
//!          │
//!          ▼
//!   ┌─► front of unplaced queue ──approach──► NotFound ──► requeue ──┐
//!   │                                  │                             │
//!   │                               Arrived                          │
//!   │                                  ▼                             │
//!   │                     grasp ──fail──► back off, retry            │
//!   │                                  │                             │
//!   │                                  ▼                             │
//!   │          approach rally ──► release ──► widen ──► back off     │
//!   └──────────────────────────────────┴─────────────────────────────┘
//!                       until the unplaced queue is empty
//! ```
//!
//! Markers are collected in discovery order, not by distance.  The registry
//! keeps growing while the robot moves, so the queue can get longer during a
//! run.
//!
//! Three bounds turn the open-ended retries into mission failures:
//! `max_grasp_attempts` per marker, `max_rally_attempts` per delivery, and
//! the [`RequeueGuard`] for a queue in which nothing is reachable any more.

use std::time::Instant;

use chrono::Utc;
use retriever_hal::{DriveBase, MarkerSensor, MotionStats, Rover};
use retriever_memory::TargetRegistry;
use retriever_nav::{ApproachController, ClosestObjectScanner};
use retriever_types::{MarkerId, RetrieveError, Thresholds};
use tracing::{info, info_span, instrument, warn};
use uuid::Uuid;

use crate::config::MissionConfig;
use crate::report::MissionReport;
use crate::requeue_guard::RequeueGuard;

/// Owns the robot and the registry for the duration of one mission.
pub struct MissionSequencer<B> {
    rover: Rover<B>,
    registry: TargetRegistry,
    config: MissionConfig,
    thresholds: Thresholds,
    scanner: ClosestObjectScanner,
    controller: ApproachController,
    guard: RequeueGuard,
    delivered: Vec<MarkerId>,
    requeues: u32,
    grasp_failures: u32,
}

impl<B: MarkerSensor + DriveBase> MissionSequencer<B> {
    /// # Errors
    ///
    /// [`RetrieveError::InvalidConfig`] if `config` does not validate.
    pub fn new(rover: Rover<B>, config: MissionConfig) -> Result<Self, RetrieveError> {
        config.validate()?;
        Ok(Self {
            rover,
            registry: TargetRegistry::new(),
            thresholds: config.thresholds,
            scanner: ClosestObjectScanner::new(config.scanner),
            controller: ApproachController::new(config.approach),
            guard: RequeueGuard::new(config.max_requeue_rounds as usize),
            config,
            delivered: Vec::new(),
            requeues: 0,
            grasp_failures: 0,
        })
    }

    pub fn rover(&self) -> &Rover<B> {
        &self.rover
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Current thresholds, including the widened rally tolerance.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn motion_stats(&self) -> MotionStats {
        self.rover.stats()
    }

    /// Run the mission until every discovered marker sits at the rally point.
    ///
    /// # Errors
    ///
    /// - [`RetrieveError::NothingToCollect`] – the initial sweep saw nothing.
    /// - [`RetrieveError::GraspExhausted`] / [`RetrieveError::RallyPointLost`]
    ///   / [`RetrieveError::Stalled`] – a retry bound was hit.
    /// - [`RetrieveError::HardwareFault`] – propagated from the backend.
    pub fn run(&mut self) -> Result<MissionReport, RetrieveError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let _span = info_span!("mission", %run_id).entered();
        info!(%started_at, "mission started");

        let rally = self.establish_rally_point()?;

        while let Some(target) = self.registry.front() {
            if self.collect(target)? {
                self.deliver(target, rally)?;
            }
        }

        let elapsed = clock.elapsed();
        info!(
            delivered = self.delivered.len(),
            requeues = self.requeues,
            elapsed_s = elapsed.as_secs_f64(),
            "mission complete"
        );
        Ok(MissionReport {
            run_id,
            started_at,
            elapsed_secs: elapsed.as_secs_f64(),
            rally_point: rally,
            delivered: self.delivered.clone(),
            requeues: self.requeues,
            grasp_failures: self.grasp_failures,
            final_rally_distance: self.thresholds.rally_distance,
        })
    }

    fn establish_rally_point(&mut self) -> Result<MarkerId, RetrieveError> {
        let closest = self
            .scanner
            .scan(&mut self.rover, &mut self.registry)?
            .ok_or(RetrieveError::NothingToCollect)?;
        self.registry.choose_rally_point(closest.marker)?;
        Ok(closest.marker)
    }

    /// Approach and grasp `target`.
    ///
    /// `Ok(false)` means the marker was unreachable and has been requeued.
    #[instrument(skip(self), fields(target = %target))]
    fn collect(&mut self, target: MarkerId) -> Result<bool, RetrieveError> {
        let mut attempts = 0_u32;
        loop {
            let report = self.controller.approach(
                &mut self.rover,
                &mut self.registry,
                target,
                self.thresholds.pickup(),
            )?;
            if !report.arrived() {
                self.registry.requeue(target);
                self.requeues += 1;
                warn!(queue = self.registry.unplaced_len(), "marker unreachable, requeued");
                if self.guard.record_miss(self.registry.unplaced_len()) {
                    return Err(RetrieveError::Stalled {
                        remaining: self.registry.unplaced().collect(),
                    });
                }
                return Ok(false);
            }

            if self.rover.grasp()? {
                info!(corrective_steps = report.corrective_steps, "grasped marker");
                self.guard.reset();
                return Ok(true);
            }

            attempts += 1;
            self.grasp_failures += 1;
            warn!(attempts, "grasp failed");
            if attempts >= self.config.max_grasp_attempts {
                return Err(RetrieveError::GraspExhausted {
                    marker: target,
                    attempts,
                });
            }
            self.back_off()?;
        }
    }

    /// Carry the held marker to the rally point and drop it there.
    #[instrument(skip(self), fields(held = %held, rally = %rally))]
    fn deliver(&mut self, held: MarkerId, rally: MarkerId) -> Result<(), RetrieveError> {
        let mut attempts = 0_u32;
        loop {
            let report = self.controller.approach(
                &mut self.rover,
                &mut self.registry,
                rally,
                self.thresholds.rally(),
            )?;
            if report.arrived() {
                break;
            }
            attempts += 1;
            warn!(attempts, "rally point not found while carrying");
            if attempts >= self.config.max_rally_attempts {
                return Err(RetrieveError::RallyPointLost(rally));
            }
            self.back_off()?;
        }

        self.rover.release()?;
        self.thresholds.widen_rally();
        self.registry.mark_delivered(held)?;
        self.delivered.push(held);
        self.back_off()
    }

    /// Reverse away from whatever is in front, then absorb the new view.
    fn back_off(&mut self) -> Result<(), RetrieveError> {
        let backoff = self.config.backoff;
        self.rover.drive(backoff.speed, backoff.duration())?;
        let frame = self.rover.scan();
        self.registry.observe(&frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use retriever_hal::{MotionCommand, ScriptedFeed, SimArena};
    use retriever_types::Detection;

    const A: MarkerId = MarkerId(1);
    const B: MarkerId = MarkerId(2);
    const C: MarkerId = MarkerId(3);

    fn sequencer(arena: SimArena, config: MissionConfig) -> MissionSequencer<SimArena> {
        MissionSequencer::new(Rover::new(arena), config).unwrap()
    }

    #[test]
    fn nearest_becomes_rally_point_and_the_rest_are_delivered_in_order() {
        let arena = SimArena::polar(&[(1, 3.0, -20.0), (2, 1.0, 0.0), (3, 2.0, 25.0)]);
        let mut mission = sequencer(arena, MissionConfig::default());
        let report = mission.run().unwrap();

        assert_eq!(report.rally_point, B);
        assert_eq!(report.delivered, vec![A, C]);
        assert_eq!(mission.registry().placed(), &[B, A, C]);
        assert!(mission.registry().is_complete());
        assert_eq!(report.requeues, 0);
        assert!((report.final_rally_distance - 0.73).abs() < 1e-4);

        let arena = mission.rover().backend();
        assert_eq!(arena.held(), None);
        for marker in [A, C] {
            let gap = arena.separation(marker, B).unwrap();
            assert!(gap < 0.6, "{marker} dropped {gap} m from the rally point");
        }
    }

    #[test]
    fn rally_tolerance_widens_once_per_delivery() {
        let arena = SimArena::polar(&[(1, 1.5, 10.0), (2, 0.8, -10.0)]);
        let mut mission = sequencer(arena, MissionConfig::default());
        let report = mission.run().unwrap();

        assert_eq!(report.delivered, vec![A]);
        let expected = Thresholds::default().rally_distance + Thresholds::default().rally_increment;
        assert!((mission.thresholds().rally_distance - expected).abs() < 1e-6);
    }

    #[test]
    fn empty_arena_has_nothing_to_collect() {
        let mut mission = sequencer(SimArena::polar(&[]), MissionConfig::default());
        assert_eq!(mission.run(), Err(RetrieveError::NothingToCollect));
    }

    #[test]
    fn vanished_marker_is_requeued_and_the_next_one_collected() {
        let d = MarkerId(4);
        let e = MarkerId(5);
        let rally = MarkerId(6);
        let mut arena = SimArena::polar(&[(6, 0.8, 0.0), (4, 2.0, 20.0), (5, 2.5, -60.0)]);
        arena.vanish_after_travel(d, 0.2);
        let config = MissionConfig {
            max_requeue_rounds: 2,
            ..MissionConfig::default()
        };
        let mut mission = sequencer(arena, config);

        let err = mission.run().unwrap_err();

        // D was given up on only after E had been delivered.
        assert_eq!(err, RetrieveError::Stalled { remaining: vec![d] });
        assert_eq!(mission.registry().placed(), &[rally, e]);
        assert_eq!(mission.rover().backend().held(), None);
    }

    #[test]
    fn grasp_failures_back_off_and_retry() {
        let mut arena = SimArena::polar(&[(1, 0.6, 0.0), (2, 1.5, -15.0)]);
        arena.fail_next_grasps(2);
        let mut mission = sequencer(arena, MissionConfig::default());
        let report = mission.run().unwrap();

        assert_eq!(report.grasp_failures, 2);
        assert_eq!(report.delivered, vec![B]);

        // Two back-offs after failures, one after the release.
        let reverses = mission
            .rover()
            .backend()
            .commands()
            .iter()
            .filter(|c| matches!(c, MotionCommand::Drive { speed, .. } if *speed < 0.0))
            .count();
        assert_eq!(reverses, 3);
    }

    #[test]
    fn repeated_grasp_failure_aborts_the_mission() {
        let mut arena = SimArena::polar(&[(1, 0.6, 0.0), (2, 1.5, -15.0)]);
        arena.fail_next_grasps(100);
        let mut mission = sequencer(arena, MissionConfig::default());

        assert_eq!(
            mission.run(),
            Err(RetrieveError::GraspExhausted { marker: B, attempts: 3 })
        );
        assert_eq!(mission.motion_stats().grasps, 3);
    }

    #[test]
    fn losing_the_rally_point_while_carrying_aborts() {
        let rally = MarkerId(1);
        let mut arena = SimArena::polar(&[(1, 0.6, 0.0), (2, 1.5, -30.0)]);
        // Gone before the robot has finished closing in on marker 2.
        arena.vanish_after_travel(rally, 0.8);
        let mut mission = sequencer(arena, MissionConfig::default());

        assert_eq!(mission.run(), Err(RetrieveError::RallyPointLost(rally)));
        assert_eq!(mission.rover().backend().held(), Some(B));
    }

    #[test]
    fn scripted_single_delivery() {
        // Rally 9 and target 4 both visible at all times; 4 is already in reach.
        let frame = vec![Detection::new(9, 0.3, 0.0), Detection::new(4, 0.35, 1.0)];
        let feed = ScriptedFeed::new(vec![frame]);
        let mut mission = MissionSequencer::new(Rover::new(feed), MissionConfig::default()).unwrap();
        let report = mission.run().unwrap();

        assert_eq!(report.rally_point, MarkerId(9));
        assert_eq!(report.delivered, vec![MarkerId(4)]);
        let stats = mission.motion_stats();
        assert_eq!((stats.grasps, stats.releases), (1, 1));
    }

    /// Rally 9 and target 4 are always in reach; marker 5 only comes into
    /// view once the robot has reversed.
    #[derive(Default)]
    struct HiddenBehind {
        reversed: bool,
    }

    impl MarkerSensor for HiddenBehind {
        fn see(&mut self) -> Vec<Detection> {
            let mut frame = vec![Detection::new(9, 0.3, 0.0), Detection::new(4, 0.35, 1.0)];
            if self.reversed {
                frame.push(Detection::new(5, 0.35, -1.0));
            }
            frame
        }
    }

    impl DriveBase for HiddenBehind {
        fn rotate(&mut self, _speed: f32, _duration: Duration) -> Result<(), RetrieveError> {
            Ok(())
        }
        fn drive_straight(&mut self, speed: f32, _duration: Duration) -> Result<(), RetrieveError> {
            if speed < 0.0 {
                self.reversed = true;
            }
            Ok(())
        }
        fn grasp(&mut self) -> Result<bool, RetrieveError> {
            Ok(true)
        }
        fn release(&mut self) -> Result<(), RetrieveError> {
            Ok(())
        }
    }

    #[test]
    fn markers_revealed_by_backing_off_are_collected() {
        let mut mission =
            MissionSequencer::new(Rover::new(HiddenBehind::default()), MissionConfig::default()).unwrap();
        let report = mission.run().unwrap();

        assert_eq!(report.delivered, vec![MarkerId(4), MarkerId(5)]);
        assert_eq!(mission.registry().placed(), &[MarkerId(9), MarkerId(4), MarkerId(5)]);
        assert!(mission.registry().is_complete());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = MissionConfig {
            max_grasp_attempts: 0,
            ..MissionConfig::default()
        };
        assert!(matches!(
            MissionSequencer::new(Rover::new(SimArena::polar(&[])), config),
            Err(RetrieveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn report_ids_are_unique_per_run() {
        let frame = vec![Detection::new(9, 0.3, 0.0)];
        let mut first = MissionSequencer::new(
            Rover::new(ScriptedFeed::new(vec![frame.clone()])),
            MissionConfig::default(),
        )
        .unwrap();
        let mut second =
            MissionSequencer::new(Rover::new(ScriptedFeed::new(vec![frame])), MissionConfig::default()).unwrap();
        let a = first.run().unwrap();
        let b = second.run().unwrap();
        assert_ne!(a.run_id, b.run_id);
        assert!(a.delivered.is_empty());
    }
}
