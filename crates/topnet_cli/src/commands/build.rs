//! Build command - compile a component spec into a topology graph.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use topnet_builder::TopologyBuilder;
use topnet_spec::{SpecReader, Tier};

#[derive(Args)]
pub struct BuildArgs {
    /// Path to the component spec (JSON or YAML)
    pub spec: PathBuf,

    /// Write the graph here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Force an architecture tier instead of classifying the spec text
    #[arg(long, value_parser = parse_tier)]
    pub tier: Option<Tier>,
}

fn parse_tier(s: &str) -> Result<Tier, String> {
    match s {
        "1" => Ok(Tier::One),
        "2" => Ok(Tier::Two),
        _ => Err(format!("unknown tier '{s}', expected 1 or 2")),
    }
}

pub fn execute(args: BuildArgs) -> Result<()> {
    let spec = SpecReader::read_file(&args.spec)
        .with_context(|| format!("reading spec from {}", args.spec.display()))?;

    let mut builder = TopologyBuilder::new(&spec);
    if let Some(tier) = args.tier {
        builder = builder.with_tier(tier);
    }
    info!(tier = builder.tier().value(), "compiling topology");

    let graph = builder.build()?;
    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "topology compiled"
    );

    let json = serde_json::to_string_pretty(&graph)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing graph to {}", path.display()))?;
            println!("Graph written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
