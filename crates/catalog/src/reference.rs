//! Reference bandwidth values per toolchain and target.

use crate::metric::Metric;
use crate::target::Target;
use crate::toolchain::Toolchain;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Expected value with a fractional tolerance band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub expected: f64,
    /// Fractional lower tolerance, `<= 0` (e.g. `-0.05`).
    pub lower: f64,
    /// Fractional upper tolerance, `>= 0`.
    pub upper: f64,
    pub unit: String,
}

impl ReferenceEntry {
    pub fn new(expected: f64, lower: f64, upper: f64, unit: impl Into<String>) -> Self {
        Self {
            expected,
            lower,
            upper,
            unit: unit.into(),
        }
    }

    /// Bandwidth reference in MB/s with the usual ±5% band.
    fn mbps(expected: f64) -> Self {
        Self::new(expected, -0.05, 0.05, "MB/s")
    }

    /// Absolute acceptance band `[low, high]`.
    pub fn band(&self) -> (f64, f64) {
        (
            self.expected * (1.0 + self.lower),
            self.expected * (1.0 + self.upper),
        )
    }

    pub fn contains(&self, value: f64) -> bool {
        let (low, high) = self.band();
        value >= low && value <= high
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.expected.is_finite() {
            return Err("Expected value must be finite".into());
        }
        if self.lower > 0.0 {
            return Err(format!("Lower tolerance must be <= 0, got {}", self.lower));
        }
        if self.upper < 0.0 {
            return Err(format!("Upper tolerance must be >= 0, got {}", self.upper));
        }
        Ok(())
    }
}

pub type MetricReferences = BTreeMap<Metric, ReferenceEntry>;

/// References resolved for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedReferences {
    /// Toolchain whose table was actually used.
    pub toolchain: Toolchain,
    pub entries: MetricReferences,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    tables: BTreeMap<Toolchain, BTreeMap<Target, MetricReferences>>,
}

fn uniform(copy_scale: f64, add_triad: f64) -> MetricReferences {
    per_metric(copy_scale, copy_scale, add_triad, add_triad)
}

fn per_metric(copy: f64, scale: f64, add: f64, triad: f64) -> MetricReferences {
    BTreeMap::from([
        (Metric::Copy, ReferenceEntry::mbps(copy)),
        (Metric::Scale, ReferenceEntry::mbps(scale)),
        (Metric::Add, ReferenceEntry::mbps(add)),
        (Metric::Triad, ReferenceEntry::mbps(triad)),
    ])
}

static BUILTIN: OnceLock<ReferenceTable> = OnceLock::new();

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference values measured on kebnekaise.
    pub fn builtin() -> &'static ReferenceTable {
        BUILTIN.get_or_init(|| {
            let mut table = ReferenceTable::new();

            table.insert(Toolchain::Foss, Target::Broadwell, uniform(74000.0, 84500.0));
            table.insert(Toolchain::Foss, Target::Skylake, uniform(103900.0, 116700.0));
            table.insert(
                Toolchain::Foss,
                Target::KnightsLanding,
                per_metric(57000.0, 56000.0, 63000.0, 63000.0),
            );
            table.insert(Toolchain::Foss, Target::LargeMemory, uniform(191500.0, 198000.0));

            table.insert(Toolchain::Intel, Target::Broadwell, uniform(120500.0, 108000.0));
            table.insert(
                Toolchain::Intel,
                Target::Skylake,
                per_metric(155000.0, 155000.0, 113000.0, 115000.0),
            );
            table.insert(Toolchain::Intel, Target::KnightsLanding, uniform(57000.0, 57900.0));
            table.insert(
                Toolchain::Intel,
                Target::LargeMemory,
                per_metric(233000.0, 228000.0, 225000.0, 230000.0),
            );

            table
        })
    }

    pub fn insert(&mut self, toolchain: Toolchain, target: Target, refs: MetricReferences) {
        self.tables.entry(toolchain).or_default().insert(target, refs);
    }

    pub fn get(&self, toolchain: Toolchain, target: Target) -> Option<&MetricReferences> {
        self.tables.get(&toolchain).and_then(|by_target| by_target.get(&target))
    }

    /// Resolve the sub-table for a run.
    ///
    /// Unknown toolchains use [`Toolchain::PRIMARY`]'s table. Targets with no
    /// references (or unknown targets) resolve to an empty sub-table.
    pub fn lookup(&self, toolchain_id: &str, target: Option<Target>) -> ResolvedReferences {
        let toolchain = match Toolchain::from_id(toolchain_id) {
            Some(tc) if self.tables.contains_key(&tc) => tc,
            _ => {
                tracing::warn!(
                    toolchain_id,
                    fallback = "references",
                    primary = %Toolchain::PRIMARY,
                    "no references for toolchain; using primary toolchain's table"
                );
                Toolchain::PRIMARY
            }
        };

        let entries = match target.and_then(|t| self.get(toolchain, t)) {
            Some(entries) => entries.clone(),
            None => {
                let target_id = target
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "<unknown>".into());
                tracing::warn!(
                    toolchain = %toolchain,
                    target_id = %target_id,
                    "no references for target; performance will not be checked"
                );
                MetricReferences::new()
            }
        };

        ResolvedReferences { toolchain, entries }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (toolchain, by_target) in &self.tables {
            for (target, refs) in by_target {
                for (metric, entry) in refs {
                    entry
                        .validate()
                        .map_err(|e| format!("{}/{}/{}: {}", toolchain, target, metric, e))?;
                }
            }
        }
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .with_context(|| format!("failed to read reference table {}", path.display()))?;
        let table: ReferenceTable = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse reference table {}", path.display()))?;
        table
            .validate()
            .map_err(|e| anyhow!("invalid reference table {}: {}", path.display(), e))?;
        Ok(table)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_is_inclusive() {
        let entry = ReferenceEntry::mbps(100.0);
        let (low, high) = entry.band();
        assert!((low - 95.0).abs() < 1e-9);
        assert!((high - 105.0).abs() < 1e-9);
        assert!(entry.contains(low));
        assert!(entry.contains(high));
        assert!(!entry.contains(94.9));
        assert!(!entry.contains(105.1));
    }

    #[test]
    fn test_builtin_intel_sky() {
        let refs = ReferenceTable::builtin()
            .get(Toolchain::Intel, Target::Skylake)
            .unwrap();
        assert_eq!(refs[&Metric::Add].expected, 113000.0);
        assert_eq!(refs[&Metric::Triad].expected, 115000.0);
        assert_eq!(refs[&Metric::Copy].unit, "MB/s");
    }

    #[test]
    fn test_unknown_toolchain_falls_back_to_foss() {
        let resolved = ReferenceTable::builtin().lookup("cray", Some(Target::Broadwell));
        assert_eq!(resolved.toolchain, Toolchain::Foss);
        assert_eq!(resolved.entries[&Metric::Copy].expected, 74000.0);
    }

    #[test]
    fn test_gpu_has_no_references() {
        let resolved = ReferenceTable::builtin().lookup("foss", Some(Target::Gpu));
        assert!(resolved.entries.is_empty());
        let resolved = ReferenceTable::builtin().lookup("intel", None);
        assert_eq!(resolved.toolchain, Toolchain::Intel);
        assert!(resolved.entries.is_empty());
    }

    #[test]
    fn test_builtin_is_valid() {
        assert!(ReferenceTable::builtin().validate().is_ok());
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let entry = ReferenceEntry::new(100.0, 0.1, 0.05, "MB/s");
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.json");
        ReferenceTable::builtin().save_to_file(&path).unwrap();
        let loaded = ReferenceTable::load_from_file(&path).unwrap();
        assert_eq!(&loaded, ReferenceTable::builtin());
    }
}
