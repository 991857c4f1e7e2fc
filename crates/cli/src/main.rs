//! `streambench` executable.

use anyhow::Result;
use clap::Parser;
use streambench_harness::cli::{run_cli, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run_cli(cli)
}
