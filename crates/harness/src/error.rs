//! Errors from the external build and run interfaces.

use std::path::PathBuf;
use std::process::ExitStatus;
use streambench_planner::LauncherMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("source file {0} not found")]
    MissingSource(PathBuf),

    #[error("failed to spawn compiler `{compiler}`")]
    Spawn {
        compiler: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compiling {path} failed ({status}): {stderr}")]
    Failed {
        path: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("could not prepare build directory {path}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("launcher `{0}` is not supported by this runner")]
    UnsupportedLauncher(LauncherMode),

    #[error("failed to start {executable}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{executable} exited with {status}: {stderr}")]
    Failed {
        executable: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
}

/// Failures that stop the pipeline before a report can be produced.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid run plan: {0}")]
    InvalidPlan(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Run(#[from] RunError),
}
