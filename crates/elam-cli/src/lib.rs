//! The `elam` CLI: argument parsing and the lex→parse→lower→elaborate
//! driver. The binary entry point lives under `src/bin/elam.rs`; this
//! crate is split out so the driver can be exercised by integration
//! tests without spawning a process.

pub mod args;
pub mod driver;

pub use args::CliArgs;
pub use driver::{run, DriverError, RunResult};
