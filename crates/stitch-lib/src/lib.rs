//! Multi-round "stitch sort" for columnar data.
//!
//! Sorts a row-set by a composite key spread across several narrow `u32`
//! columns. Each round materializes a few key columns into a packed
//! `(rowID, key..)` tuple buffer ([`column::StitchedColumn`]), sorts it
//! with a width-specialized comparator, and hands an equality-group
//! partition to the next round so rows already proven unique are never
//! sorted again. [`bench::Benchmark`] drives whole plans and reports
//! where the time goes.

pub mod bench;
pub mod column;
pub mod data;
pub mod timer;
pub mod verify;

pub use bench::{Benchmark, PlanStats, StitchPlan, TimingType};
pub use column::{RawColumn, SortingGroup, SortingState, StitchedColumn};
