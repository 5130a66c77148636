//! Sample/Test Allocation
//!
//! Pure logic for the assignment engine: expanding quotation lines into
//! ordered test slots (used once, at sample generation) and grouping
//! already-assigned samples by test type (used by worksheets and report
//! consolidation). No database access here.

pub mod distribution;
pub mod expansion;

pub use distribution::{covered_set, group_by_test, AssignedSample, SampleRef, TestGroup};
pub use expansion::{expand, TestLine, TestSlot};
