//! Validate command - run the validation engine against a graph.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use topnet_graph::{Graph, Severity};
use topnet_validate::run_all_validations;

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to a topology graph (JSON)
    pub graph: PathBuf,

    /// Treat warnings as failures
    #[arg(long)]
    pub strict: bool,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let data = std::fs::read_to_string(&args.graph)
        .with_context(|| format!("reading graph from {}", args.graph.display()))?;
    let graph: Graph = serde_json::from_str(&data).context("parsing graph")?;
    graph.check_integrity()?;

    info!(graph = %graph.id, "validating topology");
    let findings = run_all_validations(&graph);

    let errors: Vec<_> = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .collect();
    let warnings: Vec<_> = findings
        .iter()
        .filter(|f| f.severity == Severity::Warning)
        .collect();
    let infos: Vec<_> = findings
        .iter()
        .filter(|f| f.severity == Severity::Info)
        .collect();

    if !errors.is_empty() {
        println!("Errors:");
        for f in &errors {
            println!("  [{}] {}", f.id, f.message);
        }
    }
    if !warnings.is_empty() {
        println!("Warnings:");
        for f in &warnings {
            println!("  [{}] {}", f.id, f.message);
        }
    }
    if !infos.is_empty() {
        println!("Notes:");
        for f in &infos {
            println!("  [{}] {}", f.id, f.message);
        }
    }

    if !errors.is_empty() || (args.strict && !warnings.is_empty()) {
        anyhow::bail!(
            "validation failed: {} error(s), {} warning(s)",
            errors.len(),
            warnings.len()
        );
    }

    println!(
        "Validation passed ({} warning(s), {} note(s))",
        warnings.len(),
        infos.len()
    );
    Ok(())
}
