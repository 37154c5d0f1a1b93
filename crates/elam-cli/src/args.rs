use std::path::PathBuf;

use clap::Parser;

/// CLI arguments for the `elam` binary.
#[derive(Parser, Debug)]
#[command(name = "elam", version, about = "Elaborator for the elam bootstrap language")]
pub struct CliArgs {
    /// Enable verbose tracing: constraint-queue and HIR-register activity
    /// are printed to stdout as the elaborator runs.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Source file to elaborate.
    pub entry_file: PathBuf,
}
