//! [`MissionReport`] – summary of a finished run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use retriever_types::MarkerId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run in seconds.
    pub elapsed_secs: f64,
    pub rally_point: MarkerId,
    /// Markers dropped at the rally point, in delivery order.
    pub delivered: Vec<MarkerId>,
    /// Times an unreachable marker was sent to the back of the queue.
    pub requeues: u32,
    pub grasp_failures: u32,
    /// Rally arrival tolerance after the last widening (metres).
    pub final_rally_distance: f32,
}

impl MissionReport {
    pub fn elapsed(&self) -> Duration {
        Duration::try_from_secs_f64(self.elapsed_secs).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_with_plain_marker_numbers() {
        let report = MissionReport {
            run_id: Uuid::nil(),
            started_at: DateTime::<Utc>::UNIX_EPOCH,
            elapsed_secs: 12.5,
            rally_point: MarkerId(9),
            delivered: vec![MarkerId(6), MarkerId(7)],
            requeues: 1,
            grasp_failures: 0,
            final_rally_distance: 0.73,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rally_point"], 9);
        assert_eq!(json["delivered"], serde_json::json!([6, 7]));
        assert_eq!(json["run_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(report.elapsed(), Duration::from_millis(12_500));
    }
}
