//! Verification reports.

use crate::extract::{ExtractedMetrics, ExtractionError, OutputExtractor};
use crate::verifier::{failing_metrics, MetricResults, Verifier, VerifyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use streambench_catalog::Metric;
use streambench_planner::RunPlan;

/// Overall verdict, most fundamental failure first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    /// STREAM did not report a validated solution.
    SanityFailure { marker: String },
    /// Output did not have the expected shape.
    ExtractionFailure { errors: Vec<ExtractionError> },
    /// Lists all metrics outside their band.
    ToleranceFailure { failing: Vec<Metric> },
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

/// Complete record of one verified run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub plan: RunPlan,
    pub outcome: Outcome,
    pub sanity_passed: bool,
    /// Every value read from the output, referenced or not.
    pub observed: ExtractedMetrics,
    pub metrics: MetricResults,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extraction_errors: Vec<ExtractionError>,
    /// Nodes the run was placed on.
    pub nodelist: Vec<String>,
    pub generated_at_unix_ms: u128,
}

impl VerificationReport {
    /// Run the extract and verify stages over captured output.
    pub fn from_output(plan: &RunPlan, stdout: &str, nodelist: Vec<String>) -> Self {
        let extractor = OutputExtractor;
        let verifier = Verifier::new(plan.references.entries.clone());

        let sanity = extractor.check_sanity(stdout);
        let (observed, extraction_errors) = extractor.extract_all(stdout);

        let metrics = match verifier.verify(&observed) {
            Ok(results) => results,
            Err(VerifyError::MissingMetric(metric)) => {
                tracing::debug!(metric = %metric, "verifying the metrics that were extracted");
                verifier.verify_available(&observed)
            }
        };

        let failing = failing_metrics(&metrics);
        let outcome = if let Err(failure) = &sanity {
            Outcome::SanityFailure {
                marker: failure.marker.clone(),
            }
        } else if !extraction_errors.is_empty() {
            Outcome::ExtractionFailure {
                errors: extraction_errors.clone(),
            }
        } else if !failing.is_empty() {
            Outcome::ToleranceFailure { failing }
        } else {
            Outcome::Passed
        };

        let report = Self {
            plan: plan.clone(),
            outcome,
            sanity_passed: sanity.is_ok(),
            observed,
            metrics,
            extraction_errors,
            nodelist,
            generated_at_unix_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_else(|_| Duration::from_secs(0))
                .as_millis(),
        };
        report.log();
        report
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }

    fn log(&self) {
        for (metric, result) in &self.metrics {
            tracing::info!(
                metric = %metric,
                observed = result.observed,
                expected = result.expected,
                lower = result.lower_bound,
                upper = result.upper_bound,
                unit = %result.unit,
                passed = result.passed,
                "metric checked"
            );
        }
        match &self.outcome {
            Outcome::Passed => tracing::info!(
                target_id = %self.plan.target_id,
                toolchain_id = %self.plan.toolchain_id,
                "STREAM check passed"
            ),
            Outcome::SanityFailure { marker } => tracing::error!(
                target_id = %self.plan.target_id,
                marker = %marker,
                "STREAM output failed sanity check"
            ),
            Outcome::ExtractionFailure { errors } => {
                for err in errors {
                    tracing::error!(error = %err, "could not extract metric");
                }
            }
            Outcome::ToleranceFailure { failing } => tracing::error!(
                target_id = %self.plan.target_id,
                failing = ?failing,
                "bandwidth outside reference band"
            ),
        }
    }

    /// Observed-value deltas against a previous report, for shared metrics.
    pub fn diff(&self, baseline: &VerificationReport) -> BTreeMap<Metric, MetricDelta> {
        self.observed
            .iter()
            .filter_map(|(metric, current)| {
                baseline.observed.get(metric).map(|previous| {
                    let delta = current - previous;
                    let relative = if *previous != 0.0 { delta / previous } else { 0.0 };
                    (
                        *metric,
                        MetricDelta {
                            current: *current,
                            baseline: *previous,
                            delta,
                            relative,
                        },
                    )
                })
            })
            .collect()
    }

    /// Save report to JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load report from JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let report = serde_json::from_str(&json)?;
        Ok(report)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDelta {
    pub current: f64,
    pub baseline: f64,
    pub delta: f64,
    pub relative: f64,
}

/// Report over captured output without a planner instance.
pub fn report_for(plan: &RunPlan, stdout: &str) -> VerificationReport {
    VerificationReport::from_output(plan, stdout, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use streambench_planner::plan;

    fn stream_output(copy: f64, scale: f64, add: f64, triad: f64, validated: bool) -> String {
        let mut out = String::from(
            "Function    Best Rate MB/s  Avg time     Min time     Max time\n",
        );
        out.push_str(&format!("Copy:      {:.1}     0.718012     0.716861     0.719570\n", copy));
        out.push_str(&format!("Scale:     {:.1}     0.721190     0.719857     0.723301\n", scale));
        out.push_str(&format!("Add:       {:.1}     0.968733     0.967888     0.970012\n", add));
        out.push_str(&format!("Triad:     {:.1}     0.971330     0.970496     0.972411\n", triad));
        if validated {
            out.push_str("Solution Validates: avg error less than 1.000000e-13 on all three arrays\n");
        }
        out
    }

    #[test]
    fn test_pass() {
        let plan = plan("kebnekaise:bdw", "foss");
        let report = report_for(&plan, &stream_output(74000.0, 73000.0, 85000.0, 84500.0, true));
        assert!(report.passed());
        assert!(report.sanity_passed);
        assert_eq!(report.metrics.len(), 4);
        assert!(report.metrics.values().all(|r| r.passed));
    }

    #[test]
    fn test_sanity_failure_wins_over_good_metrics() {
        let plan = plan("kebnekaise:bdw", "foss");
        let report = report_for(&plan, &stream_output(74000.0, 74000.0, 84500.0, 84500.0, false));
        assert!(!report.passed());
        assert!(!report.sanity_passed);
        assert!(matches!(report.outcome, Outcome::SanityFailure { .. }));
        assert!(report.metrics.values().all(|r| r.passed));
    }

    #[test]
    fn test_tolerance_failure_lists_each_metric() {
        let plan = plan("kebnekaise:bdw", "foss");
        let report = report_for(&plan, &stream_output(60000.0, 74000.0, 84500.0, 99000.0, true));
        assert_eq!(
            report.outcome,
            Outcome::ToleranceFailure {
                failing: vec![Metric::Copy, Metric::Triad]
            }
        );
    }

    #[test]
    fn test_extraction_failure() {
        let plan = plan("kebnekaise:bdw", "foss");
        let raw = stream_output(74000.0, 74000.0, 84500.0, 84500.0, true).replace("Triad:", "");
        let report = report_for(&plan, &raw);
        match &report.outcome {
            Outcome::ExtractionFailure { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].metric(), Metric::Triad);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!report.observed.contains_key(&Metric::Triad));
        assert_eq!(report.metrics.len(), 3);
    }

    #[test]
    fn test_target_without_references_only_checks_output() {
        let plan = plan("kebnekaise:gpu", "foss");
        let report = report_for(&plan, &stream_output(1.0, 1.0, 1.0, 1.0, true));
        assert!(report.passed());
        assert!(report.metrics.is_empty());
        assert_eq!(report.observed.len(), 4);
    }

    #[test]
    fn test_diff_against_baseline() {
        let plan = plan("kebnekaise:bdw", "foss");
        let baseline = report_for(&plan, &stream_output(70000.0, 74000.0, 84500.0, 84500.0, true));
        let current = report_for(&plan, &stream_output(77000.0, 74000.0, 84500.0, 84500.0, true));
        let deltas = current.diff(&baseline);
        assert_eq!(deltas.len(), 4);
        assert_eq!(deltas[&Metric::Copy].delta, 7000.0);
        assert!((deltas[&Metric::Copy].relative - 0.1).abs() < 1e-9);
        assert_eq!(deltas[&Metric::Add].delta, 0.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let plan = plan("kebnekaise:sky", "intel");
        let report = VerificationReport::from_output(
            &plan,
            &stream_output(155000.0, 155000.0, 113000.0, 115000.0, true),
            vec!["b-cn0932".into()],
        );
        report.save(&path).unwrap();
        let loaded = VerificationReport::load(&path).unwrap();
        assert_eq!(loaded, report);
        assert_eq!(loaded.nodelist, vec!["b-cn0932".to_string()]);
    }
}
