//! Multi-touch marketing attribution: per-user purchase windows, last-touch,
//! first-touch, linear and U-shaped credit allocation, the per-week/per-user
//! attribution matrix and per-channel ROI.

pub mod attribution;
pub mod index;
pub mod matrix;
pub mod roi;

pub use attribution::{Allocation, AttributionEngine, AttributionModel, AttributionOutput};
pub use index::{CandidateWindow, EventIndex, IndexedEvent, UserTimeline};
pub use matrix::{round_half_even, Aggregator, AttributionMatrix, MatrixRow, PivotRow, UShapedPivot};
pub use roi::{MissingSide, RoiCalculator, RoiReport, RoiRow, UnmatchedChannel};
