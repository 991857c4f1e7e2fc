//! Benchmark session orchestration.

use crate::build::{Builder, SingleSourceBuilder};
use crate::error::HarnessError;
use crate::pipeline::{build_stage, execute_stage, plan_stage, verify_stage};
use crate::runner::{LocalRunner, Runner};
use std::path::PathBuf;
use streambench_catalog::ReferenceTable;
use streambench_planner::{RunPlan, RunPlanner};
use streambench_verify::VerificationReport;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Directory holding `stream.c`.
    pub source_dir: PathBuf,
    /// Replacement for the built-in reference values.
    pub references: Option<ReferenceTable>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            references: None,
        }
    }
}

pub struct BenchmarkSession<B = SingleSourceBuilder, R = LocalRunner> {
    planner: RunPlanner,
    builder: B,
    runner: R,
    options: SessionOptions,
}

impl BenchmarkSession {
    /// Session using the system C compiler and a local runner.
    pub fn local(builder: SingleSourceBuilder, options: SessionOptions) -> Self {
        Self::new(builder, LocalRunner, options)
    }
}

impl<B: Builder, R: Runner> BenchmarkSession<B, R> {
    pub fn new(builder: B, runner: R, options: SessionOptions) -> Self {
        let planner = match &options.references {
            Some(table) => RunPlanner::with_references(table.clone()),
            None => RunPlanner::new(),
        };
        Self {
            planner,
            builder,
            runner,
            options,
        }
    }

    pub fn planner(&self) -> &RunPlanner {
        &self.planner
    }

    pub fn plan(&self, target_id: &str, toolchain_id: &str) -> Result<RunPlan, HarnessError> {
        plan_stage(&self.planner, target_id, toolchain_id)
    }

    /// Plan, build, run and verify one (target, toolchain) combination.
    pub fn run(
        &self,
        target_id: &str,
        toolchain_id: &str,
    ) -> Result<VerificationReport, HarnessError> {
        let plan = self.plan(target_id, toolchain_id)?;
        let executable = build_stage(&self.builder, &plan, &self.options.source_dir)?;
        let output = execute_stage(&self.runner, &plan, &executable)?;
        let report = verify_stage(&plan, output);

        info!(
            target_id,
            toolchain_id,
            passed = report.passed(),
            nodes = ?report.nodelist,
            "session finished"
        );
        Ok(report)
    }

    /// Verify output captured elsewhere against a fresh plan.
    pub fn verify_output(
        &self,
        target_id: &str,
        toolchain_id: &str,
        stdout: &str,
        nodelist: Vec<String>,
    ) -> Result<VerificationReport, HarnessError> {
        let plan = self.plan(target_id, toolchain_id)?;
        Ok(VerificationReport::from_output(&plan, stdout, nodelist))
    }
}
