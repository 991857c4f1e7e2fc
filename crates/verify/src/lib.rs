//! Output extraction and verification for the STREAM check.
//!
//! Three failure kinds are kept apart so a broken node is not mistaken for
//! a performance regression:
//!
//! - sanity: STREAM never printed its validation line
//! - extraction: a kernel's line is missing or malformed
//! - tolerance: a bandwidth figure is outside its reference band

pub mod extract;
pub mod report;
pub mod verifier;

pub use extract::{
    extract, ExtractedMetrics, ExtractionError, OutputExtractor, SanityFailure, SANITY_MARKER,
};
pub use report::{report_for, MetricDelta, Outcome, VerificationReport};
pub use verifier::{verify, failing_metrics, MetricResults, VerificationResult, Verifier, VerifyError};
