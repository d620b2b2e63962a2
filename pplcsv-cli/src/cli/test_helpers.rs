//! Small helpers shared across CLI tests.
//!
//! The CLI unit tests build temporary CSV files and a matching configuration,
//! then assert on the rewritten file. These helpers keep the cases concise.

use std::fs;
use std::path::{Path, PathBuf};

use pplcsv_core::Scorer;
use pplcsv_providers_openai::DEFAULT_API_BASE;
use tempfile::TempDir;

use super::{CliError, OutputMode, run_with_scorer};
use crate::settings::{DEFAULT_SCORE_COLUMN, ScorerConfig};

pub(super) fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

pub(super) fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Err(err) = fs::write(&path, contents) {
        panic!("failed to write {}: {err}", path.display());
    }
    path
}

pub(super) fn read(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => panic!("failed to read {}: {err}", path.display()),
    }
}

pub(super) fn config_for(csv_file: PathBuf, batch_size: usize) -> ScorerConfig {
    ScorerConfig {
        csv_file,
        csv_sentence_header: "sentence".to_owned(),
        model_name: "gpt2".to_owned(),
        batch_size,
        delimiter: b',',
        score_column: DEFAULT_SCORE_COLUMN.to_owned(),
        api_base: DEFAULT_API_BASE.to_owned(),
        api_key: None,
        request_timeout: None,
        parallel: false,
    }
}

pub(super) fn run_expecting_error(
    config: &ScorerConfig,
    scorer: &dyn Scorer,
    panic_msg: &str,
) -> CliError {
    match run_with_scorer(config, scorer, OutputMode::Rewrite) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}
