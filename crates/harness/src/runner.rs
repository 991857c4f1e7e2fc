//! Execution of the built benchmark.

use crate::error::RunError;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use streambench_planner::{LauncherMode, RunPlan};
use tracing::info;

/// Everything a runner needs to start the benchmark once.
#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub executable: &'a Path,
    pub args: &'a [String],
    pub env: &'a BTreeMap<String, String>,
    pub launcher: LauncherMode,
    pub exclusive: bool,
}

impl<'a> RunRequest<'a> {
    pub fn from_plan(plan: &'a RunPlan, executable: &'a Path) -> Self {
        Self {
            executable,
            args: &plan.executable_opts,
            env: &plan.env,
            launcher: plan.launcher,
            exclusive: plan.resources.exclusive_access,
        }
    }
}

/// Captured result of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub nodelist: Vec<String>,
}

pub trait Runner {
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutput, RunError>;
}

impl<T: Runner + ?Sized> Runner for &T {
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutput, RunError> {
        (**self).run(request)
    }
}

/// Starts the executable directly on this node.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRunner;

impl LocalRunner {
    fn hostname() -> String {
        std::env::var("HOSTNAME")
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    }
}

impl Runner for LocalRunner {
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutput, RunError> {
        if request.launcher != LauncherMode::Local {
            return Err(RunError::UnsupportedLauncher(request.launcher));
        }

        info!(
            executable = %request.executable.display(),
            args = ?request.args,
            env = ?request.env,
            exclusive = request.exclusive,
            "starting benchmark"
        );

        // The child gets the plan's variables; our own environment is untouched.
        let output = Command::new(request.executable)
            .args(request.args)
            .envs(request.env)
            .output()
            .map_err(|source| RunError::Spawn {
                executable: request.executable.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(RunError::Failed {
                executable: request.executable.to_path_buf(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            nodelist: vec![Self::hostname()],
        })
    }
}
