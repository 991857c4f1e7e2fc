//! STREAM kernels reported as bandwidth metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Copy,
    Scale,
    Add,
    Triad,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Copy, Metric::Scale, Metric::Add, Metric::Triad];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Copy => "copy",
            Metric::Scale => "scale",
            Metric::Add => "add",
            Metric::Triad => "triad",
        }
    }

    /// Leading label of the metric's line in STREAM output.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Copy => "Copy:",
            Metric::Scale => "Scale:",
            Metric::Add => "Add:",
            Metric::Triad => "Triad:",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
