//! STREAM check harness.
//!
//! Runs the ordered pipeline plan → build → execute → verify over pluggable
//! [`build::Builder`] and [`runner::Runner`] implementations and produces a
//! [`streambench_verify::VerificationReport`].

pub mod build;
#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod pipeline;
pub mod runner;
pub mod session;

pub use build::*;
#[cfg(feature = "cli")]
pub use cli::*;
pub use error::*;
pub use pipeline::*;
pub use runner::*;
pub use session::*;
