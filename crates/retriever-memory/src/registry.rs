//! Target Registry.
//!
//! Tracks every marker the robot has ever seen in one of two disjoint,
//! order-preserving collections:
//!
//! | collection | meaning                                                   |
//! |------------|-----------------------------------------------------------|
//! | `unplaced` | discovered, still lying somewhere in the arena (a queue)  |
//! | `placed`   | delivered to the rally point (the rally marker comes first) |
//!
//! A marker moves `unplaced → placed` exactly once.  While it is unreachable
//! it may cycle to the back of `unplaced`, but it never leaves it any other
//! way.
//!
//! # Example
//!
//! ```rust
//! use retriever_memory::TargetRegistry;
//! use retriever_types::{Detection, MarkerId};
//!
//! let mut registry = TargetRegistry::new();
//! registry.observe(&[Detection::new(4, 2.0, 0.0), Detection::new(9, 1.0, 5.0)]);
//!
//! registry.choose_rally_point(MarkerId(9)).unwrap();
//! assert_eq!(registry.front(), Some(MarkerId(4)));
//!
//! registry.mark_delivered(MarkerId(4)).unwrap();
//! assert!(registry.is_complete());
//! assert_eq!(registry.placed(), &[MarkerId(9), MarkerId(4)]);
//! ```

use std::collections::VecDeque;

use retriever_types::{Detection, MarkerId, RetrieveError};
use serde::Serialize;
use tracing::info;

// ─────────────────────────────────────────────────────────────────────────────
// MarkerStatus
// ─────────────────────────────────────────────────────────────────────────────

/// Where a marker currently sits in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStatus {
    /// Never seen.
    Unknown,
    /// Discovered and waiting to be collected.
    Unplaced,
    /// Delivered to (or chosen as) the rally point.
    Placed,
}

// ─────────────────────────────────────────────────────────────────────────────
// TargetRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Incremental record of discovered and delivered markers.
///
/// Owned by the mission sequencer and lent by `&mut` to whatever routine is
/// moving the robot, so discovery happens continuously while driving.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetRegistry {
    unplaced: VecDeque<MarkerId>,
    placed: Vec<MarkerId>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a perception frame.
    ///
    /// Every marker that is in neither collection is appended to `unplaced`
    /// in frame order.  Returns how many markers were new.
    pub fn observe(&mut self, frame: &[Detection]) -> usize {
        let mut discovered = 0;
        for detection in frame {
            if self.status(detection.marker) == MarkerStatus::Unknown {
                self.unplaced.push_back(detection.marker);
                discovered += 1;
                info!(marker = %detection.marker, distance = detection.distance, "detected new marker");
            }
        }
        discovered
    }

    /// Promote the nearest marker found by the initial sweep to rally point.
    ///
    /// # Errors
    ///
    /// [`RetrieveError::NotUnplaced`] if `marker` is not waiting in
    /// `unplaced`.  That is a logic error in the caller and is fatal.
    pub fn choose_rally_point(&mut self, marker: MarkerId) -> Result<(), RetrieveError> {
        self.promote(marker)?;
        info!(%marker, "rally point chosen");
        Ok(())
    }

    /// Record that `marker` has been dropped at the rally point.
    ///
    /// # Errors
    ///
    /// [`RetrieveError::NotUnplaced`] if `marker` is not waiting in
    /// `unplaced`.
    pub fn mark_delivered(&mut self, marker: MarkerId) -> Result<(), RetrieveError> {
        self.promote(marker)?;
        info!(%marker, placed = self.placed.len(), remaining = self.unplaced.len(), "placed marker at rally point");
        Ok(())
    }

    /// Send an unreachable marker to the back of the queue.
    ///
    /// No-op for placed or unknown markers.  Returns `true` if the marker was
    /// moved.
    pub fn requeue(&mut self, marker: MarkerId) -> bool {
        let Some(index) = self.unplaced.iter().position(|m| *m == marker) else {
            return false;
        };
        if let Some(m) = self.unplaced.remove(index) {
            self.unplaced.push_back(m);
        }
        true
    }

    /// The next marker to collect, in discovery order.
    pub fn front(&self) -> Option<MarkerId> {
        self.unplaced.front().copied()
    }

    pub fn status(&self, marker: MarkerId) -> MarkerStatus {
        if self.unplaced.contains(&marker) {
            MarkerStatus::Unplaced
        } else if self.placed.contains(&marker) {
            MarkerStatus::Placed
        } else {
            MarkerStatus::Unknown
        }
    }

    pub fn unplaced(&self) -> impl ExactSizeIterator<Item = MarkerId> + '_ {
        self.unplaced.iter().copied()
    }

    pub fn placed(&self) -> &[MarkerId] {
        &self.placed
    }

    pub fn unplaced_len(&self) -> usize {
        self.unplaced.len()
    }

    /// `true` once nothing is left to collect.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    fn promote(&mut self, marker: MarkerId) -> Result<(), RetrieveError> {
        let index = self
            .unplaced
            .iter()
            .position(|m| *m == marker)
            .ok_or(RetrieveError::NotUnplaced(marker))?;
        self.unplaced.remove(index);
        self.placed.push(marker);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn frame(codes: &[u32]) -> Vec<Detection> {
        codes.iter().map(|&c| Detection::new(c, 1.0, 0.0)).collect()
    }

    fn ids(codes: &[u32]) -> Vec<MarkerId> {
        codes.iter().map(|&c| MarkerId(c)).collect()
    }

    fn assert_disjoint(registry: &TargetRegistry) {
        let unplaced: HashSet<MarkerId> = registry.unplaced().collect();
        assert_eq!(unplaced.len(), registry.unplaced_len(), "no duplicates in unplaced");
        for m in registry.placed() {
            assert!(!unplaced.contains(m), "{m} is in both collections");
        }
    }

    #[test]
    fn observe_appends_only_unknown_markers_in_order() {
        let mut registry = TargetRegistry::new();
        assert_eq!(registry.observe(&frame(&[3, 1, 3, 2])), 3);
        assert_eq!(registry.observe(&frame(&[2, 1])), 0);
        assert_eq!(registry.unplaced().collect::<Vec<_>>(), ids(&[3, 1, 2]));
    }

    #[test]
    fn observe_ignores_placed_markers() {
        let mut registry = TargetRegistry::new();
        registry.observe(&frame(&[5, 6]));
        registry.choose_rally_point(MarkerId(5)).unwrap();
        registry.observe(&frame(&[5, 6, 7]));
        assert_eq!(registry.unplaced().collect::<Vec<_>>(), ids(&[6, 7]));
        assert_eq!(registry.placed(), &ids(&[5])[..]);
    }

    #[test]
    fn rally_point_precondition_is_enforced() {
        let mut registry = TargetRegistry::new();
        assert_eq!(
            registry.choose_rally_point(MarkerId(1)),
            Err(RetrieveError::NotUnplaced(MarkerId(1)))
        );
        registry.observe(&frame(&[1]));
        registry.choose_rally_point(MarkerId(1)).unwrap();
        // Already placed: a second promotion is a logic error.
        assert!(registry.mark_delivered(MarkerId(1)).is_err());
    }

    #[test]
    fn requeue_moves_to_back_and_preserves_size() {
        let mut registry = TargetRegistry::new();
        registry.observe(&frame(&[1, 2, 3, 4]));
        assert!(registry.requeue(MarkerId(2)));
        assert_eq!(registry.unplaced().collect::<Vec<_>>(), ids(&[1, 3, 4, 2]));
        assert_eq!(registry.unplaced_len(), 4);

        // Requeueing the last element keeps the order.
        assert!(registry.requeue(MarkerId(2)));
        assert_eq!(registry.unplaced().collect::<Vec<_>>(), ids(&[1, 3, 4, 2]));
    }

    #[test]
    fn requeue_is_noop_for_placed_and_unknown() {
        let mut registry = TargetRegistry::new();
        registry.observe(&frame(&[1, 2]));
        registry.choose_rally_point(MarkerId(1)).unwrap();
        assert!(!registry.requeue(MarkerId(1)));
        assert!(!registry.requeue(MarkerId(42)));
        assert_eq!(registry.unplaced().collect::<Vec<_>>(), ids(&[2]));
        assert_eq!(registry.placed(), &ids(&[1])[..]);
    }

    #[test]
    fn status_reports_membership() {
        let mut registry = TargetRegistry::new();
        registry.observe(&frame(&[1, 2]));
        registry.choose_rally_point(MarkerId(2)).unwrap();
        assert_eq!(registry.status(MarkerId(1)), MarkerStatus::Unplaced);
        assert_eq!(registry.status(MarkerId(2)), MarkerStatus::Placed);
        assert_eq!(registry.status(MarkerId(3)), MarkerStatus::Unknown);
    }

    #[test]
    fn invariants_hold_over_long_mixed_sequences() {
        // Deterministic LCG so the sequence is reproducible.
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move |bound: u32| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as u32) % bound
        };

        let mut registry = TargetRegistry::new();
        let mut ever_seen: HashSet<MarkerId> = HashSet::new();

        for _ in 0..2_000 {
            let marker = MarkerId(next(24));
            match next(4) {
                0 => {
                    let f = frame(&[marker.0, next(24)]);
                    ever_seen.extend(f.iter().map(|d| d.marker));
                    registry.observe(&f);
                }
                1 => {
                    let was_unplaced = registry.status(marker) == MarkerStatus::Unplaced;
                    assert_eq!(registry.mark_delivered(marker).is_ok(), was_unplaced);
                }
                2 => {
                    let before = registry.unplaced_len();
                    let was_unplaced = registry.status(marker) == MarkerStatus::Unplaced;
                    assert_eq!(registry.requeue(marker), was_unplaced);
                    assert_eq!(registry.unplaced_len(), before);
                    if was_unplaced {
                        assert_eq!(registry.unplaced().last(), Some(marker));
                    }
                }
                _ => {
                    let _ = registry.choose_rally_point(marker);
                }
            }
            assert_disjoint(&registry);
            assert_eq!(
                registry.unplaced_len() + registry.placed().len(),
                ever_seen.len(),
                "every observed marker is in exactly one collection"
            );
        }
    }

    #[test]
    fn registry_serializes_for_reports() {
        let mut registry = TargetRegistry::new();
        registry.observe(&frame(&[1, 2]));
        registry.choose_rally_point(MarkerId(1)).unwrap();
        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(json, r#"{"unplaced":[2],"placed":[1]}"#);
    }
}
