//! STREAM memory-bandwidth regression check.
//!
//! Facade over the workspace crates:
//!
//! - [`catalog`]: targets, toolchains and reference values
//! - [`planner`]: run plans
//! - [`verify`]: output extraction, tolerance checks and reports
//! - [`harness`]: build/run interfaces and the pipeline

pub use streambench_catalog as catalog;
pub use streambench_harness as harness;
pub use streambench_planner as planner;
pub use streambench_verify as verify;
