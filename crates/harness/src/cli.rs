//! CLI wiring for the streambench harness.

use crate::build::SingleSourceBuilder;
use crate::session::{BenchmarkSession, SessionOptions};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use streambench_catalog::{ReferenceTable, Target, TargetCatalog};
use streambench_verify::{Outcome, VerificationReport};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "streambench", about = "STREAM memory-bandwidth regression check")]
pub struct Cli {
    /// JSON reference table replacing the built-in values.
    #[arg(long, global = true)]
    pub references: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug, Clone)]
pub struct Selection {
    /// Partition, e.g. `kebnekaise:sky` or `sky`.
    #[arg(long)]
    pub target: String,
    /// Programming environment, e.g. `foss` or `intel`.
    #[arg(long, default_value = "foss")]
    pub toolchain: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReportArgs {
    /// Write the verification report here.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Previous report to compare observed bandwidth against.
    #[arg(long)]
    pub baseline: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved run plan as JSON.
    Plan {
        #[command(flatten)]
        selection: Selection,
    },
    /// List known targets and their parameters.
    Targets,
    /// Verify STREAM output captured from an earlier run.
    Verify {
        #[command(flatten)]
        selection: Selection,
        /// File holding the captured stdout.
        #[arg(long)]
        output: PathBuf,
        /// Nodes the output was produced on.
        #[arg(long, value_delimiter = ',')]
        nodelist: Vec<String>,
        #[command(flatten)]
        reporting: ReportArgs,
    },
    /// Build, run and verify STREAM on this node.
    Run {
        #[command(flatten)]
        selection: Selection,
        /// Directory holding stream.c.
        #[arg(long, default_value = ".")]
        source_dir: PathBuf,
        #[arg(long, default_value = "cc")]
        compiler: String,
        #[arg(long, default_value = "build")]
        build_dir: PathBuf,
        #[command(flatten)]
        reporting: ReportArgs,
    },
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let Cli {
        references,
        command,
    } = cli;

    let references = match references {
        Some(path) => Some(ReferenceTable::load_from_file(&path)?),
        None => None,
    };

    match command {
        Command::Plan { selection } => {
            let session = BenchmarkSession::local(
                SingleSourceBuilder::default(),
                SessionOptions {
                    references,
                    ..SessionOptions::default()
                },
            );
            let plan = session.plan(&selection.target, &selection.toolchain)?;
            println!("{}", plan.to_json()?);
        }
        Command::Targets => {
            for target in Target::ALL {
                let params = TargetCatalog.params(target);
                println!(
                    "{:<16} cpus_per_task={:<3} threads={:<4} array_mi_elements={:<6} validated={}",
                    target.fullname(),
                    params.cpus_per_task,
                    params.threads(),
                    params.array_mi_elements,
                    target.is_validated()
                );
            }
        }
        Command::Verify {
            selection,
            output,
            nodelist,
            reporting,
        } => {
            let stdout = fs::read_to_string(&output)
                .with_context(|| format!("failed to read {}", output.display()))?;
            let session = BenchmarkSession::local(
                SingleSourceBuilder::default(),
                SessionOptions {
                    references,
                    ..SessionOptions::default()
                },
            );
            let verification =
                session.verify_output(&selection.target, &selection.toolchain, &stdout, nodelist)?;
            finish(&verification, &reporting)?;
        }
        Command::Run {
            selection,
            source_dir,
            compiler,
            build_dir,
            reporting,
        } => {
            let session = BenchmarkSession::local(
                SingleSourceBuilder::new(compiler, build_dir),
                SessionOptions {
                    source_dir,
                    references,
                },
            );
            let verification = session.run(&selection.target, &selection.toolchain)?;
            finish(&verification, &reporting)?;
        }
    }
    Ok(())
}

fn finish(verification: &VerificationReport, args: &ReportArgs) -> Result<()> {
    print_summary(verification);

    if let Some(path) = &args.baseline {
        print_baseline_diff(verification, path)?;
    }

    if let Some(path) = &args.report {
        verification
            .save(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    match &verification.outcome {
        Outcome::Passed => Ok(()),
        Outcome::SanityFailure { marker } => bail!("sanity check failed: {:?} not found", marker),
        Outcome::ExtractionFailure { errors } => {
            bail!("could not extract {} metric(s) from output", errors.len())
        }
        Outcome::ToleranceFailure { failing } => {
            let names: Vec<&str> = failing.iter().map(|m| m.name()).collect();
            bail!("outside reference band: {}", names.join(", "))
        }
    }
}

fn print_summary(verification: &VerificationReport) {
    let plan = &verification.plan;
    println!(
        "target={} toolchain={} references={} threads={} nodes={}",
        plan.target_id,
        plan.toolchain_id,
        plan.references.toolchain,
        plan.threads,
        verification.nodelist.join(",")
    );
    for (metric, value) in &verification.observed {
        match verification.metrics.get(metric) {
            Some(result) => println!(
                "- {}: {:.1} {} expected={:.1} band=[{:.1}, {:.1}] {}",
                metric,
                value,
                result.unit,
                result.expected,
                result.lower_bound,
                result.upper_bound,
                if result.passed { "ok" } else { "FAIL" }
            ),
            None => println!("- {}: {:.1} (no reference)", metric, value),
        }
    }
    for err in &verification.extraction_errors {
        println!("! {}", err);
    }
    println!(
        "sanity={} outcome={}",
        if verification.sanity_passed { "ok" } else { "FAIL" },
        if verification.passed() { "PASS" } else { "FAIL" }
    );
}

fn print_baseline_diff(verification: &VerificationReport, path: &Path) -> Result<()> {
    if !path.exists() {
        info!(path = %path.display(), "baseline report not found; skipping diff");
        return Ok(());
    }
    let baseline = VerificationReport::load(path)
        .with_context(|| format!("failed to load baseline {}", path.display()))?;
    for (metric, delta) in verification.diff(&baseline) {
        println!(
            "Δ {}: {:+.1} ({:+.2}%)",
            metric,
            delta.delta,
            delta.relative * 100.0
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verify_command() {
        let cli = Cli::try_parse_from([
            "streambench",
            "verify",
            "--target",
            "kebnekaise:knl",
            "--toolchain",
            "intel",
            "--output",
            "stream.out",
            "--nodelist",
            "b-cn0101,b-cn0102",
        ])
        .unwrap();
        match cli.command {
            Command::Verify {
                selection,
                nodelist,
                reporting,
                ..
            } => {
                assert_eq!(selection.target, "kebnekaise:knl");
                assert_eq!(selection.toolchain, "intel");
                assert_eq!(nodelist, vec!["b-cn0101", "b-cn0102"]);
                assert!(reporting.report.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_toolchain_defaults_to_foss() {
        let cli = Cli::try_parse_from(["streambench", "plan", "--target", "sky"]).unwrap();
        match cli.command {
            Command::Plan { selection } => assert_eq!(selection.toolchain, "foss"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_references_flag() {
        let cli = Cli::try_parse_from([
            "streambench",
            "plan",
            "--target",
            "lm",
            "--references",
            "refs.json",
        ])
        .unwrap();
        assert_eq!(cli.references, Some(PathBuf::from("refs.json")));
    }
}
