//! Generate command - lower a graph to a Terraform JSON descriptor.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use topnet_graph::{Graph, Severity};
use topnet_iac::generate_terraform;
use topnet_validate::run_all_validations;

#[derive(Args)]
pub struct GenerateArgs {
    /// Path to a topology graph (JSON)
    pub graph: PathBuf,

    /// Directory to write the descriptor into
    #[arg(short, long, default_value = "deploy")]
    pub out_dir: PathBuf,

    /// Generate even when the graph has error-severity findings
    #[arg(long)]
    pub force: bool,
}

pub fn execute(args: GenerateArgs) -> Result<()> {
    let data = std::fs::read_to_string(&args.graph)
        .with_context(|| format!("reading graph from {}", args.graph.display()))?;
    let graph: Graph = serde_json::from_str(&data).context("parsing graph")?;

    // refuse to deploy a graph the validator rejects
    let errors: Vec<_> = run_all_validations(&graph)
        .into_iter()
        .filter(|f| f.severity == Severity::Error)
        .collect();
    if !errors.is_empty() && !args.force {
        for f in &errors {
            eprintln!("  [{}] {}", f.id, f.message);
        }
        anyhow::bail!(
            "validation found {} error(s); fix them or pass --force",
            errors.len()
        );
    }

    let files = generate_terraform(&graph).context("terraform generation")?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    for file in &files {
        let path = args.out_dir.join(&file.filename);
        std::fs::write(&path, &file.content)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(file = %path.display(), bytes = file.content.len(), "wrote artifact");
        println!("Wrote {}", path.display());
    }
    Ok(())
}
