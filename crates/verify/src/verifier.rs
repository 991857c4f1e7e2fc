//! Tolerance checks of extracted bandwidth against reference values.

use crate::extract::ExtractedMetrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use streambench_catalog::{Metric, MetricReferences, ReferenceEntry};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("metric {0} has a reference value but was not extracted")]
    MissingMetric(Metric),
}

/// Outcome of checking one metric against its band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub observed: f64,
    pub expected: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub unit: String,
    pub passed: bool,
}

impl VerificationResult {
    pub fn check(observed: f64, reference: &ReferenceEntry) -> Self {
        let (lower_bound, upper_bound) = reference.band();
        Self {
            observed,
            expected: reference.expected,
            lower_bound,
            upper_bound,
            unit: reference.unit.clone(),
            passed: reference.contains(observed),
        }
    }

    /// Signed fractional deviation from the expected value.
    pub fn deviation(&self) -> f64 {
        if self.expected == 0.0 {
            0.0
        } else {
            (self.observed - self.expected) / self.expected
        }
    }
}

pub type MetricResults = BTreeMap<Metric, VerificationResult>;

/// Checks metrics against one resolved reference sub-table.
#[derive(Debug, Clone)]
pub struct Verifier {
    references: MetricReferences,
}

impl Verifier {
    pub fn new(references: MetricReferences) -> Self {
        Self { references }
    }

    pub fn references(&self) -> &MetricReferences {
        &self.references
    }

    /// Check every referenced metric; a referenced metric that was not
    /// extracted is an error.
    pub fn verify(&self, metrics: &ExtractedMetrics) -> Result<MetricResults, VerifyError> {
        let mut results = MetricResults::new();
        for (metric, reference) in &self.references {
            let observed = metrics
                .get(metric)
                .copied()
                .ok_or(VerifyError::MissingMetric(*metric))?;
            results.insert(*metric, VerificationResult::check(observed, reference));
        }
        Ok(results)
    }

    /// Check only the referenced metrics that are present.
    pub fn verify_available(&self, metrics: &ExtractedMetrics) -> MetricResults {
        self.references
            .iter()
            .filter_map(|(metric, reference)| {
                metrics
                    .get(metric)
                    .map(|observed| (*metric, VerificationResult::check(*observed, reference)))
            })
            .collect()
    }
}

/// Shorthand for [`Verifier::verify`].
pub fn verify(
    metrics: &ExtractedMetrics,
    references: &MetricReferences,
) -> Result<MetricResults, VerifyError> {
    Verifier::new(references.clone()).verify(metrics)
}

/// Metrics whose observed value is outside the band.
pub fn failing_metrics(results: &MetricResults) -> Vec<Metric> {
    results
        .iter()
        .filter(|(_, result)| !result.passed)
        .map(|(metric, _)| *metric)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use streambench_catalog::{ReferenceTable, Target, Toolchain};

    fn sky_foss() -> MetricReferences {
        ReferenceTable::builtin()
            .get(Toolchain::Foss, Target::Skylake)
            .cloned()
            .unwrap()
    }

    fn at_expected(refs: &MetricReferences) -> ExtractedMetrics {
        refs.iter().map(|(m, e)| (*m, e.expected)).collect()
    }

    #[test]
    fn test_all_within_band() {
        let refs = sky_foss();
        let results = verify(&at_expected(&refs), &refs).unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.values().all(|r| r.passed));
        assert!(failing_metrics(&results).is_empty());
    }

    #[test]
    fn test_ten_percent_low_fails_only_that_metric() {
        let refs = sky_foss();
        let mut metrics = at_expected(&refs);
        metrics.insert(Metric::Scale, 103900.0 * 0.9);

        let results = verify(&metrics, &refs).unwrap();
        assert_eq!(failing_metrics(&results), vec![Metric::Scale]);
        assert!((results[&Metric::Scale].deviation() + 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_band_edges_pass() {
        let entry = ReferenceEntry::new(1000.0, -0.05, 0.05, "MB/s");
        assert!(VerificationResult::check(950.0, &entry).passed);
        assert!(VerificationResult::check(1050.0, &entry).passed);
        assert!(!VerificationResult::check(1050.5, &entry).passed);
    }

    #[test]
    fn test_missing_referenced_metric_is_fatal() {
        let refs = sky_foss();
        let mut metrics = at_expected(&refs);
        metrics.remove(&Metric::Triad);
        assert_eq!(
            verify(&metrics, &refs).unwrap_err(),
            VerifyError::MissingMetric(Metric::Triad)
        );
        assert_eq!(Verifier::new(refs).verify_available(&metrics).len(), 3);
    }

    #[test]
    fn test_empty_references_check_nothing() {
        let results = verify(&ExtractedMetrics::new(), &MetricReferences::new()).unwrap();
        assert!(results.is_empty());
    }
}
