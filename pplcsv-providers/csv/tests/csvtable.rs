//! Integration tests for loading and atomically rewriting CSV files.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use pplcsv_providers_csv::{ColumnPlacement, CsvProviderError, CsvTable};
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

#[rstest]
fn from_path_reports_missing_file(dir: TempDir) {
    let path = dir.path().join("missing.csv");
    let err = CsvTable::from_path(&path, b',').expect_err("missing file must fail");
    assert!(matches!(err, CsvProviderError::Open { path: reported, .. } if reported == path));
}

#[rstest]
fn persist_replaces_file_with_appended_column(dir: TempDir) -> Result<()> {
    let path = write_file(&dir, "data.csv", "id,sentence\n1,hello world\n2,the cat sat\n")?;
    let mut table = CsvTable::from_path(&path, b',')?;
    let placement = table.set_column("Perplexity", vec!["10.5".into(), "22.3".into()])?;
    assert_eq!(placement, ColumnPlacement::Appended);

    table.persist(&path)?;

    assert_eq!(
        fs::read_to_string(&path)?,
        "id,sentence,Perplexity\n1,hello world,10.5\n2,the cat sat,22.3\n"
    );
    let leftovers: Vec<_> = fs::read_dir(dir.path())?.collect();
    assert_eq!(leftovers.len(), 1, "staging file must be renamed away");
    Ok(())
}

#[rstest]
fn persist_round_trip_is_stable_for_replaced_column(dir: TempDir) -> Result<()> {
    let path = write_file(&dir, "data.tsv", "sentence\tPerplexity\nhi\t1\n")?;
    let mut table = CsvTable::from_path(&path, b'\t')?;
    table.set_column("Perplexity", vec!["1".into()])?;
    table.persist(&path)?;
    let first = fs::read_to_string(&path)?;

    let mut reloaded = CsvTable::from_path(&path, b'\t')?;
    let placement = reloaded.set_column("Perplexity", vec!["1".into()])?;
    reloaded.persist(&path)?;

    assert_eq!(placement, ColumnPlacement::Replaced);
    assert_eq!(fs::read_to_string(&path)?, first);
    assert_eq!(first, "sentence\tPerplexity\nhi\t1\n");
    Ok(())
}

#[cfg(unix)]
#[rstest]
fn persist_keeps_existing_permissions(dir: TempDir) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let path = write_file(&dir, "data.csv", "sentence\nhi\n")?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644))?;
    let table = CsvTable::from_path(&path, b',')?;
    table.persist(&path)?;

    let mode = fs::metadata(&path)?.permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
    Ok(())
}

#[rstest]
fn persist_into_missing_directory_fails_without_side_effects(dir: TempDir) -> Result<()> {
    let table = CsvTable::from_reader("sentence\nhi\n".as_bytes(), b',')?;
    let target = dir.path().join("absent").join("data.csv");
    let err = table.persist(&target).expect_err("missing directory must fail");
    assert!(matches!(err, CsvProviderError::Persist { .. }));
    assert!(!target.exists());
    Ok(())
}
