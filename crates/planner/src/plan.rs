//! Run plan - everything resolved before the benchmark is built and started.

use crate::launch::{openmp_env, JobResources, LauncherMode, OMP_NUM_THREADS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use streambench_catalog::{
    ReferenceTable, ResolvedReferences, Target, TargetCatalog, TargetParams, Toolchain,
    ToolchainCatalog,
};

/// Elements per Mi-element.
pub const MI: u64 = 1024 * 1024;
/// STREAM arrays are `double`.
pub const BYTES_PER_ELEMENT: u64 = 8;
/// STREAM allocates arrays a, b and c.
pub const NUM_ARRAYS: u64 = 3;

pub const STREAM_SOURCE: &str = "stream.c";

/// Total memory touched by STREAM for an array of `mi_elements` Mi-elements.
pub fn workload_bytes(mi_elements: u64) -> u64 {
    mi_elements * MI * BYTES_PER_ELEMENT * NUM_ARRAYS
}

/// How the benchmark is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Single C source file.
    pub source: String,
    /// Ordered compiler flags.
    pub cflags: Vec<String>,
    /// Build on the compute node rather than the login node.
    pub build_locally: bool,
}

/// Fully resolved plan for one (target, toolchain) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    /// Identifiers as requested.
    pub target_id: String,
    pub toolchain_id: String,

    /// Identifiers as recognized by the catalogs, if at all.
    pub target: Option<Target>,
    pub toolchain: Option<Toolchain>,

    pub params: TargetParams,
    /// OpenMP threads (`cpus_per_task × multiplier`).
    pub threads: u32,
    /// STREAM array length in elements.
    pub array_elements: u64,
    /// Memory footprint of the three arrays.
    pub workload_bytes: u64,

    pub build: BuildSpec,
    pub executable_opts: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub launcher: LauncherMode,
    pub resources: JobResources,

    pub references: ResolvedReferences,

    pub description: String,
    pub tags: BTreeSet<String>,
}

impl RunPlan {
    /// Create plan from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check internal consistency before handing the plan to a runner.
    pub fn validate(&self) -> Result<(), String> {
        if self.threads == 0 {
            return Err("Thread count must be > 0".into());
        }
        if self.array_elements == 0 {
            return Err("Array size must be > 0".into());
        }
        let declared = self.env.get(OMP_NUM_THREADS);
        if declared.map(String::as_str) != Some(self.threads.to_string().as_str()) {
            return Err(format!(
                "{} is {:?}, expected {}",
                OMP_NUM_THREADS, declared, self.threads
            ));
        }
        if self.launcher != LauncherMode::Local {
            return Err(format!("Launcher must be local, got {}", self.launcher));
        }
        if self.build.cflags.is_empty() {
            return Err("No compiler flags resolved".into());
        }
        Ok(())
    }
}

/// Resolves run plans from the static catalogs.
#[derive(Debug, Clone)]
pub struct RunPlanner {
    targets: TargetCatalog,
    toolchains: ToolchainCatalog,
    references: ReferenceTable,
}

impl RunPlanner {
    /// Planner over the built-in catalogs.
    pub fn new() -> Self {
        Self::with_references(ReferenceTable::builtin().clone())
    }

    /// Planner with a replacement reference table.
    pub fn with_references(references: ReferenceTable) -> Self {
        Self {
            targets: TargetCatalog,
            toolchains: ToolchainCatalog,
            references,
        }
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    pub fn plan(&self, target_id: &str, toolchain_id: &str) -> RunPlan {
        let (target, params) = self.targets.lookup(target_id);
        let threads = params.threads();
        let (toolchain, cflags) = self.toolchains.lookup(toolchain_id);

        let array_elements = params.array_mi_elements * MI;
        let references = self.references.lookup(toolchain_id, target);

        let plan = RunPlan {
            target_id: target_id.to_string(),
            toolchain_id: toolchain_id.to_string(),
            target,
            toolchain,
            params,
            threads,
            array_elements,
            workload_bytes: workload_bytes(params.array_mi_elements),
            build: BuildSpec {
                source: STREAM_SOURCE.to_string(),
                cflags,
                build_locally: false,
            },
            executable_opts: vec!["-s".to_string(), array_elements.to_string()],
            env: openmp_env(threads),
            launcher: LauncherMode::Local,
            resources: JobResources::single_task(params.cpus_per_task),
            references,
            description: "STREAM Benchmark".to_string(),
            tags: BTreeSet::from(["production".to_string()]),
        };

        tracing::debug!(
            target_id,
            toolchain_id,
            threads = plan.threads,
            array_elements = plan.array_elements,
            workload_bytes = plan.workload_bytes,
            reference_toolchain = %plan.references.toolchain,
            references = plan.references.entries.len(),
            "resolved run plan"
        );

        plan
    }
}

impl Default for RunPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Plan a run against the built-in catalogs.
pub fn plan(target_id: &str, toolchain_id: &str) -> RunPlan {
    RunPlanner::new().plan(target_id, toolchain_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::{OMP_PLACES, OMP_PROC_BIND};
    use streambench_catalog::Metric;

    #[test]
    fn test_workload_bytes_for_4500() {
        assert_eq!(workload_bytes(4500), 113_246_208_000);
    }

    #[test]
    fn test_plan_knl_intel() {
        let plan = plan("kebnekaise:knl", "intel");
        assert_eq!(plan.target, Some(Target::KnightsLanding));
        assert_eq!(plan.threads, 68 * 4);
        assert_eq!(plan.resources.cpus_per_task, 68);
        assert_eq!(plan.array_elements, 6800 * MI);
        assert_eq!(
            plan.executable_opts,
            vec!["-s".to_string(), (6800 * MI).to_string()]
        );
        assert_eq!(plan.env[OMP_NUM_THREADS], "272");
        assert_eq!(plan.env[OMP_PLACES], "threads");
        assert_eq!(plan.env[OMP_PROC_BIND], "spread");
        assert_eq!(plan.build.cflags[0], "-qopenmp");
        assert_eq!(plan.references.toolchain, Toolchain::Intel);
        assert_eq!(plan.references.entries[&Metric::Add].expected, 57900.0);
        assert_eq!(plan.launcher, LauncherMode::Local);
        assert!(plan.resources.exclusive_access);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_plan_unknown_target_uses_defaults() {
        let plan = plan("kebnekaise:zen4", "foss");
        assert_eq!(plan.target, None);
        assert_eq!(plan.threads, 1);
        assert_eq!(plan.params.array_mi_elements, 2500);
        assert_eq!(plan.workload_bytes, workload_bytes(2500));
        assert!(plan.references.entries.is_empty());
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_plan_unknown_toolchain_falls_back() {
        let plan = plan("kebnekaise:bdw", "gnu");
        assert_eq!(plan.toolchain, None);
        assert_eq!(plan.build.cflags, vec!["-O3".to_string()]);
        assert_eq!(plan.references.toolchain, Toolchain::Foss);
        assert_eq!(plan.references.entries[&Metric::Triad].expected, 84500.0);
    }

    #[test]
    fn test_plan_validation_catches_launcher() {
        let mut plan = plan("sky", "foss");
        plan.launcher = LauncherMode::Srun;
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_plan_serialization() {
        let plan = plan("lm", "intel");
        let json = plan.to_json().unwrap();
        let parsed = RunPlan::from_json(&json).unwrap();
        assert_eq!(plan, parsed);
    }
}
