//! Execution targets and their hardware parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cluster this check was written for.
pub const SYSTEM_NAME: &str = "kebnekaise";

/// Workload size (Mi-elements) used when a target has no catalog entry.
pub const DEFAULT_ARRAY_MI_ELEMENTS: u64 = 2500;

/// Partitions the benchmark knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Target {
    /// Broadwell compute nodes.
    #[serde(rename = "kebnekaise:bdw")]
    Broadwell,
    /// Skylake compute nodes.
    #[serde(rename = "kebnekaise:sky")]
    Skylake,
    /// GPU nodes (host side only).
    #[serde(rename = "kebnekaise:gpu")]
    Gpu,
    /// Knights Landing nodes.
    #[serde(rename = "kebnekaise:knl")]
    KnightsLanding,
    /// Large-memory nodes.
    #[serde(rename = "kebnekaise:lm")]
    LargeMemory,
}

impl Target {
    pub const ALL: [Target; 5] = [
        Target::Broadwell,
        Target::Skylake,
        Target::Gpu,
        Target::KnightsLanding,
        Target::LargeMemory,
    ];

    pub fn partition(&self) -> &'static str {
        match self {
            Target::Broadwell => "bdw",
            Target::Skylake => "sky",
            Target::Gpu => "gpu",
            Target::KnightsLanding => "knl",
            Target::LargeMemory => "lm",
        }
    }

    pub fn fullname(&self) -> String {
        format!("{}:{}", SYSTEM_NAME, self.partition())
    }

    /// Parse either `system:partition` or a bare partition name.
    pub fn from_id(id: &str) -> Option<Self> {
        let partition = match id.split_once(':') {
            Some((system, partition)) if system == SYSTEM_NAME => partition,
            Some(_) => return None,
            None => id,
        };
        Self::ALL
            .into_iter()
            .find(|target| target.partition() == partition)
    }

    /// Whether the check is validated (and has references) on this target.
    pub fn is_validated(&self) -> bool {
        !matches!(self, Target::Gpu)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", SYSTEM_NAME, self.partition())
    }
}

/// Hardware-specific run parameters for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetParams {
    /// CPUs allocated to the single benchmark task.
    pub cpus_per_task: u32,
    /// OpenMP threads per allocated CPU.
    pub thread_multiplier: u32,
    /// STREAM array length in Mi-elements (×1024²).
    pub array_mi_elements: u64,
}

impl TargetParams {
    pub const fn new(cpus_per_task: u32, thread_multiplier: u32, array_mi_elements: u64) -> Self {
        Self {
            cpus_per_task,
            thread_multiplier,
            array_mi_elements,
        }
    }

    pub fn threads(&self) -> u32 {
        self.cpus_per_task * self.thread_multiplier
    }
}

impl Default for TargetParams {
    fn default() -> Self {
        Self::new(1, 1, DEFAULT_ARRAY_MI_ELEMENTS)
    }
}

/// Static target → parameters mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetCatalog;

impl TargetCatalog {
    pub fn params(&self, target: Target) -> TargetParams {
        match target {
            Target::Broadwell | Target::Skylake | Target::Gpu => TargetParams::new(28, 1, 4500),
            // KNL runs four hardware threads per core.
            Target::KnightsLanding => TargetParams::new(68, 4, 6800),
            // 121000 would use the whole memory but takes far too long.
            Target::LargeMemory => TargetParams::new(72, 1, 24000),
        }
    }

    /// Resolve a raw target id, falling back to [`TargetParams::default`].
    pub fn lookup(&self, target_id: &str) -> (Option<Target>, TargetParams) {
        match Target::from_id(target_id) {
            Some(target) => {
                if !target.is_validated() {
                    tracing::info!(
                        target_id = %target,
                        "target is not a validated system for this check"
                    );
                }
                (Some(target), self.params(target))
            }
            None => {
                let params = TargetParams::default();
                tracing::warn!(
                    target_id,
                    fallback = "target",
                    cpus_per_task = params.cpus_per_task,
                    array_mi_elements = params.array_mi_elements,
                    "unknown target; using default parameters"
                );
                (None, params)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_and_bare_ids() {
        assert_eq!(Target::from_id("kebnekaise:knl"), Some(Target::KnightsLanding));
        assert_eq!(Target::from_id("lm"), Some(Target::LargeMemory));
        assert_eq!(Target::from_id("other:bdw"), None);
        assert_eq!(Target::from_id("kebnekaise:zen"), None);
    }

    #[test]
    fn test_display_matches_fullname() {
        for target in Target::ALL {
            assert_eq!(target.to_string(), target.fullname());
            assert_eq!(Target::from_id(&target.fullname()), Some(target));
        }
    }

    #[test]
    fn test_unknown_target_uses_default() {
        let (target, params) = TargetCatalog.lookup("kebnekaise:zen");
        assert!(target.is_none());
        assert_eq!(params.cpus_per_task, 1);
        assert_eq!(params.thread_multiplier, 1);
        assert_eq!(params.array_mi_elements, DEFAULT_ARRAY_MI_ELEMENTS);
    }

    #[test]
    fn test_knl_oversubscribes() {
        let params = TargetCatalog.params(Target::KnightsLanding);
        assert_eq!(params.threads(), 272);
        assert_eq!(TargetCatalog.params(Target::Skylake).threads(), 28);
    }

    #[test]
    fn test_target_serializes_as_fullname() {
        let json = serde_json::to_string(&Target::Skylake).unwrap();
        assert_eq!(json, "\"kebnekaise:sky\"");
    }
}
