//! Extraction of bandwidth figures from STREAM's text output.
//!
//! STREAM prints one line per kernel:
//!
//! ```text
//! Function    Best Rate MB/s  Avg time     Min time     Max time
//! Triad:          13991.7     0.017174     0.017153     0.017192
//! ```
//!
//! Only the best rate is kept. A run only counts if STREAM also reported
//! that its solution validated.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use streambench_catalog::Metric;
use thiserror::Error;

/// Printed by STREAM when the computed arrays check out.
pub const SANITY_MARKER: &str = "Solution Validates: avg error less than";

pub type ExtractedMetrics = BTreeMap<Metric, f64>;

/// The success marker is absent; results are meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("sanity marker {marker:?} not found in output")]
pub struct SanityFailure {
    pub marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    #[error("no `{label}` line with four numeric fields found for metric {metric}")]
    MissingMetric { metric: Metric, label: String },

    #[error("value {raw:?} for metric {metric} is not a number")]
    InvalidValue { metric: Metric, raw: String },
}

impl ExtractionError {
    pub fn metric(&self) -> Metric {
        match self {
            ExtractionError::MissingMetric { metric, .. }
            | ExtractionError::InvalidValue { metric, .. } => *metric,
        }
    }
}

/// One line-anchored rule per metric.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub metric: Metric,
    pattern: Regex,
}

impl ExtractionRule {
    fn for_metric(metric: Metric) -> Self {
        // label, then rate / avg / min / max separated by blanks
        let source = format!(
            r"(?m)^{}[ \t]+([0-9.]+)[ \t]+[0-9.]+[ \t]+[0-9.]+[ \t]+[0-9.]+[ \t]*\r?$",
            regex::escape(metric.label())
        );
        let pattern = Regex::new(&source).expect("built-in extraction pattern must compile");
        Self { metric, pattern }
    }

    /// First matching line's rate.
    pub fn apply(&self, raw: &str) -> Result<f64, ExtractionError> {
        let captures = self
            .pattern
            .captures(raw)
            .ok_or_else(|| ExtractionError::MissingMetric {
                metric: self.metric,
                label: self.metric.label().to_string(),
            })?;
        let value = &captures[1];
        value
            .parse::<f64>()
            .map_err(|_| ExtractionError::InvalidValue {
                metric: self.metric,
                raw: value.to_string(),
            })
    }
}

static RULES: OnceLock<Vec<ExtractionRule>> = OnceLock::new();

fn builtin_rules() -> &'static [ExtractionRule] {
    RULES.get_or_init(|| Metric::ALL.into_iter().map(ExtractionRule::for_metric).collect())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputExtractor;

impl OutputExtractor {
    pub fn rules(&self) -> &'static [ExtractionRule] {
        builtin_rules()
    }

    pub fn check_sanity(&self, raw: &str) -> Result<(), SanityFailure> {
        if raw.contains(SANITY_MARKER) {
            Ok(())
        } else {
            Err(SanityFailure {
                marker: SANITY_MARKER.to_string(),
            })
        }
    }

    /// Extract every metric, stopping at the first one that cannot be read.
    pub fn extract(&self, raw: &str) -> Result<ExtractedMetrics, ExtractionError> {
        self.rules()
            .iter()
            .map(|rule| rule.apply(raw).map(|value| (rule.metric, value)))
            .collect()
    }

    /// Extract what can be read and collect an error for everything else.
    pub fn extract_all(&self, raw: &str) -> (ExtractedMetrics, Vec<ExtractionError>) {
        let mut metrics = ExtractedMetrics::new();
        let mut errors = Vec::new();
        for rule in self.rules() {
            match rule.apply(raw) {
                Ok(value) => {
                    metrics.insert(rule.metric, value);
                }
                Err(err) => errors.push(err),
            }
        }
        (metrics, errors)
    }
}

/// Shorthand for [`OutputExtractor::extract`].
pub fn extract(raw: &str) -> Result<ExtractedMetrics, ExtractionError> {
    OutputExtractor.extract(raw)
}
