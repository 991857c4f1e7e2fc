//! Pipeline stages: plan → build → execute → verify.
//!
//! Each stage is a plain function of the previous stage's output and the
//! static configuration; nothing is carried between runs.

use crate::build::Builder;
use crate::error::{HarnessError, RunError};
use crate::runner::{RunOutput, RunRequest, Runner};
use std::fmt;
use std::path::{Path, PathBuf};
use streambench_planner::{RunPlan, RunPlanner};
use streambench_verify::VerificationReport;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Plan,
    Build,
    Execute,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Plan => "plan",
            Stage::Build => "build",
            Stage::Execute => "execute",
            Stage::Verify => "verify",
        };
        f.write_str(name)
    }
}

pub fn plan_stage(
    planner: &RunPlanner,
    target_id: &str,
    toolchain_id: &str,
) -> Result<RunPlan, HarnessError> {
    info!(stage = %Stage::Plan, target_id, toolchain_id, "entering stage");
    let plan = planner.plan(target_id, toolchain_id);
    plan.validate().map_err(HarnessError::InvalidPlan)?;
    Ok(plan)
}

pub fn build_stage<B: Builder + ?Sized>(
    builder: &B,
    plan: &RunPlan,
    source_dir: &Path,
) -> Result<PathBuf, HarnessError> {
    let source = source_dir.join(&plan.build.source);
    info!(stage = %Stage::Build, source = %source.display(), "entering stage");
    Ok(builder.build(&source, &plan.build.cflags)?)
}

pub fn execute_stage<R: Runner + ?Sized>(
    runner: &R,
    plan: &RunPlan,
    executable: &Path,
) -> Result<RunOutput, RunError> {
    info!(stage = %Stage::Execute, executable = %executable.display(), "entering stage");
    runner.run(&RunRequest::from_plan(plan, executable))
}

pub fn verify_stage(plan: &RunPlan, output: RunOutput) -> VerificationReport {
    info!(stage = %Stage::Verify, nodes = ?output.nodelist, "entering stage");
    VerificationReport::from_output(plan, &output.stdout, output.nodelist)
}
