//! Static catalogs for the STREAM check.
//!
//! Everything the run planner needs to know about the cluster lives here:
//!
//! - [`target::TargetCatalog`]: partition → CPUs, thread multiplier, array size
//! - [`toolchain::ToolchainCatalog`]: programming environment → compiler flags
//! - [`reference::ReferenceTable`]: (toolchain, partition) → expected bandwidth
//!
//! Each catalog resolves raw identifiers through a single `lookup` that
//! applies and logs the documented fallback instead of failing.

pub mod metric;
pub mod reference;
pub mod target;
pub mod toolchain;

pub use metric::Metric;
pub use reference::{MetricReferences, ReferenceEntry, ReferenceTable, ResolvedReferences};
pub use target::{Target, TargetCatalog, TargetParams, DEFAULT_ARRAY_MI_ELEMENTS};
pub use toolchain::{Toolchain, ToolchainCatalog, GENERIC_FLAGS};
