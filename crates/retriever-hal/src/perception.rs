//! Generic `MarkerSensor` trait for fiducial-marker recognition backends.

use retriever_types::Detection;

/// A perception backend that turns the current camera view into detections.
///
/// There is no error path: an empty vector means "nothing visible", not a
/// fault.  Repeated calls may return overlapping or disjoint sets and a frame
/// may list the same marker more than once.
pub trait MarkerSensor {
    /// Return every marker currently in view.
    fn see(&mut self) -> Vec<Detection>;
}
