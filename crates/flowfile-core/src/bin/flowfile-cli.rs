//! A small operator CLI around [`flowfile_core::Flowfile`]: run a saved flow
//! document, or validate one without running it.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flowfile_core::{Flowfile, FlowfileConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "flowfile-cli", about = "Run or inspect a flowfile dataflow document")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a flow document and run it to completion.
    Run {
        /// Path to a saved flow document (.json, .yaml, or .yml).
        path: PathBuf,
        /// Only run these node ids and their ancestors; defaults to every sink.
        #[arg(long, value_delimiter = ',')]
        target: Vec<i64>,
    },
    /// Load a flow document and report its topology without running it.
    Validate { path: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    flowfile_core::init_tracing();
    let cli = Cli::parse();
    let flowfile = Flowfile::new_from_env();

    let result = match cli.command {
        Command::Run { path, target } => run(&flowfile, &path, &target).await,
        Command::Validate { path } => validate(&flowfile, &path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(flowfile: &Flowfile, path: &PathBuf, target: &[i64]) -> Result<()> {
    let mut graph = flowfile.load(path).with_context(|| format!("loading {}", path.display()))?;
    let info = flowfile.run(&mut graph, target).await.with_context(|| format!("running {}", path.display()))?;
    let skipped = info.per_node_results.iter().filter(|r| r.data_handle.is_none() && r.error.is_some()).count();

    println!(
        "ran {} ({} node{}, {} completed, {} skipped) -> success={}",
        path.display(),
        graph.len(),
        if graph.len() == 1 { "" } else { "s" },
        info.nodes_completed,
        skipped,
        info.success,
    );

    for node_result in &info.per_node_results {
        if let Some(error) = &node_result.error {
            eprintln!("  node {} failed: {error}", node_result.node_id);
        }
    }

    if info.success {
        Ok(())
    } else {
        bail!("run did not complete successfully");
    }
}

fn validate(flowfile: &Flowfile, path: &PathBuf) -> Result<()> {
    let graph = flowfile.load(path).with_context(|| format!("loading {}", path.display()))?;
    let order = graph.topological_order();
    println!("{} is valid: {} node(s), topological order {:?}", path.display(), graph.len(), order);
    Ok(())
}
