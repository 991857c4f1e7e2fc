//! Programming environments and their compiler flags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flags used when the toolchain has no catalog entry.
pub const GENERIC_FLAGS: &[&str] = &["-O3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    /// GCC + OpenMPI + OpenBLAS stack.
    Foss,
    /// Intel compilers.
    Intel,
}

impl Toolchain {
    pub const ALL: [Toolchain; 2] = [Toolchain::Foss, Toolchain::Intel];

    /// Toolchain whose references stand in for unknown environments.
    pub const PRIMARY: Toolchain = Toolchain::Foss;

    pub fn name(&self) -> &'static str {
        match self {
            Toolchain::Foss => "foss",
            Toolchain::Intel => "intel",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tc| tc.name() == id)
    }

    pub fn flags(&self) -> &'static [&'static str] {
        match self {
            Toolchain::Foss => &["-fopenmp", "-O3", "-march=native", "-static"],
            Toolchain::Intel => &[
                "-qopenmp",
                "-O3",
                "-xHost",
                "-ip",
                "-ansi-alias",
                "-fno-alias",
                "-static",
                "-qopt-prefetch-distance=64,8",
                "-qopt-streaming-cache-evict=0",
                "-qopt-streaming-stores always",
            ],
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static toolchain → flags mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolchainCatalog;

impl ToolchainCatalog {
    /// Resolve compiler flags, falling back to [`GENERIC_FLAGS`].
    pub fn lookup(&self, toolchain_id: &str) -> (Option<Toolchain>, Vec<String>) {
        match Toolchain::from_id(toolchain_id) {
            Some(toolchain) => (
                Some(toolchain),
                toolchain.flags().iter().map(|f| f.to_string()).collect(),
            ),
            None => {
                tracing::warn!(
                    toolchain_id,
                    fallback = "flags",
                    flags = ?GENERIC_FLAGS,
                    "unknown toolchain; using generic optimization flags"
                );
                (None, GENERIC_FLAGS.iter().map(|f| f.to_string()).collect())
            }
        }
    }
}
