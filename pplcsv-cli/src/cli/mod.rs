//! Command-line interface orchestration for pplcsv.
//!
//! A single command loads the INI configuration, scores one CSV column in
//! batches, and writes the perplexities back into the same file.

mod commands;

pub use commands::{
    Cli, CliError, ExecutionSummary, OutputMode, ScoredRow, render_summary, run_cli,
    run_with_scorer,
};

#[cfg(test)]
mod test_helpers;
