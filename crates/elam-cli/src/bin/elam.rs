use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use elam_cli::{driver, CliArgs};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.verbose);

    let result = driver::run(&args.entry_file).with_context(|| format!("elaborating {}", args.entry_file.display()))?;
    for diagnostic in &result.diagnostics {
        println!("{diagnostic}");
    }

    std::process::exit(result.exit_code());
}

/// `-v` raises the `elam_elab` target to `debug` (constraint and HIR
/// trace lines); everything else stays at `warn` so a plain run is quiet.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_new("warn,elam_elab=debug,elam_lower=debug")
    } else {
        EnvFilter::try_new("warn")
    }
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stdout).init();
}
