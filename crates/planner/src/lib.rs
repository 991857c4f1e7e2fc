//! Run planning for the STREAM check.
//!
//! Turns a (target, toolchain) pair into a [`plan::RunPlan`]: thread count,
//! compiler flags, array size, OpenMP environment, launcher and the
//! reference values the results will be checked against. Planning never
//! fails; unknown identifiers resolve to the catalogs' documented defaults.

pub mod launch;
pub mod plan;

pub use launch::{JobResources, LauncherMode};
pub use plan::{plan, workload_bytes, BuildSpec, RunPlan, RunPlanner};
