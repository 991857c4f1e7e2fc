//! Launch settings: launcher choice, job resources and the OpenMP environment.
//!
//! STREAM is serial or OpenMP-only, so it is started directly on the
//! allocated node instead of through a distributed launcher. On KNL a
//! launcher such as `srun` can pin all threads to the wrong cores.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const OMP_NUM_THREADS: &str = "OMP_NUM_THREADS";
pub const OMP_PLACES: &str = "OMP_PLACES";
pub const OMP_PROC_BIND: &str = "OMP_PROC_BIND";

/// Thread placement granularity.
pub const PLACES_THREADS: &str = "threads";
/// Thread binding policy.
pub const PROC_BIND_SPREAD: &str = "spread";

/// How the executable is started on the allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LauncherMode {
    /// Exec the binary directly on the node.
    #[default]
    Local,
    /// Go through the scheduler's parallel launcher.
    Srun,
}

impl fmt::Display for LauncherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LauncherMode::Local => f.write_str("local"),
            LauncherMode::Srun => f.write_str("srun"),
        }
    }
}

/// Scheduler resources requested for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResources {
    pub num_tasks: u32,
    pub num_tasks_per_node: u32,
    pub cpus_per_task: u32,
    /// No other job may share the node while bandwidth is measured.
    pub exclusive_access: bool,
}

impl JobResources {
    pub fn single_task(cpus_per_task: u32) -> Self {
        Self {
            num_tasks: 1,
            num_tasks_per_node: 1,
            cpus_per_task,
            exclusive_access: true,
        }
    }
}

/// OpenMP environment for a given thread count.
pub fn openmp_env(threads: u32) -> BTreeMap<String, String> {
    BTreeMap::from([
        (OMP_PLACES.to_string(), PLACES_THREADS.to_string()),
        (OMP_PROC_BIND.to_string(), PROC_BIND_SPREAD.to_string()),
        (OMP_NUM_THREADS.to_string(), threads.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openmp_env_is_fixed_except_thread_count() {
        let env = openmp_env(272);
        assert_eq!(env.len(), 3);
        assert_eq!(env[OMP_PLACES], "threads");
        assert_eq!(env[OMP_PROC_BIND], "spread");
        assert_eq!(env[OMP_NUM_THREADS], "272");
    }

    #[test]
    fn test_single_task_is_exclusive() {
        let resources = JobResources::single_task(28);
        assert_eq!(resources.num_tasks, 1);
        assert_eq!(resources.num_tasks_per_node, 1);
        assert!(resources.exclusive_access);
    }
}
