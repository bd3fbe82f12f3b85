//! CLI command definitions.
//!
//! Each subcommand maps to one stage of the pipeline: compile a component
//! spec to a topology graph, validate a graph, or generate a deployment
//! descriptor from it.

use clap::{Parser, Subcommand};

pub mod build;
pub mod generate;
pub mod validate;

/// TopNet - cloud topology compiler
#[derive(Parser)]
#[command(name = "topnet")]
#[command(version, about = "TopNet - compile component specs into deployable cloud topologies")]
#[command(long_about = r#"
TopNet compiles a structured component specification into a provider-neutral
topology graph, checks the graph for structural and security defects, and
lowers it to a Terraform JSON deployment descriptor.

PIPELINE:
  build     → Compile a spec (JSON or YAML) into a topology graph
  validate  → Run structural and security checks against a graph
  generate  → Lower a graph to Terraform JSON

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  5 - Generation error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a component spec into a topology graph
    Build(build::BuildArgs),

    /// Validate a topology graph
    Validate(validate::ValidateArgs),

    /// Generate a Terraform JSON descriptor from a graph
    Generate(generate::GenerateArgs),
}
