//! Command implementation and argument parsing for the pplcsv CLI.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use pplcsv_core::{BatchScorerBuilder, PerplexityScores, PplError, Scorer, ScorerErrorCode};
use pplcsv_providers_csv::{ColumnPlacement, CsvProviderError, CsvTable};
use pplcsv_providers_openai::{OpenAiProviderError, OpenAiScorer};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use crate::settings::{ConfigError, ConfigOverrides, ScorerConfig};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "pplcsv",
    about = "Score a CSV text column with a language model and store the perplexities."
)]
pub struct Cli {
    /// Path to the INI configuration file.
    pub config: PathBuf,

    /// Field delimiter, overriding `delimiter` from the configuration.
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Texts per backend request, overriding `batch_size`.
    #[arg(long = "batch-size", value_parser = clap::value_parser!(usize))]
    pub batch_size: Option<usize>,

    /// Model identifier, overriding `model_name`.
    #[arg(long)]
    pub model: Option<String>,

    /// Name of the score column, overriding `score_column`.
    #[arg(long = "score-column")]
    pub score_column: Option<String>,

    /// Score batches concurrently.
    #[arg(long)]
    pub parallel: bool,

    /// Score and print the summary without rewriting the CSV file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl Cli {
    /// Returns the configuration values supplied as flags.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            delimiter: self.delimiter.clone(),
            batch_size: self.batch_size,
            model_name: self.model.clone(),
            score_column: self.score_column.clone(),
            parallel: self.parallel,
        }
    }

    /// Returns whether the CSV file will be rewritten.
    #[must_use]
    pub fn output_mode(&self) -> OutputMode {
        if self.dry_run {
            OutputMode::DryRun
        } else {
            OutputMode::Rewrite
        }
    }
}

/// What happens to the CSV file after scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Replace the file with the augmented table.
    #[default]
    Rewrite,
    /// Leave the file untouched.
    DryRun,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Reading or writing the CSV file failed.
    #[error(transparent)]
    Csv(#[from] CsvProviderError),
    /// The scoring backend could not be initialised.
    #[error(transparent)]
    Backend(#[from] OpenAiProviderError),
    /// Batch scoring failed.
    #[error(transparent)]
    Core(#[from] PplError),
}

impl CliError {
    /// Stable code of the underlying error, where one is defined.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Config(err) => Some(err.code()),
            Self::Core(err) => Some(err.code().as_str()),
            Self::Csv(_) | Self::Backend(_) => None,
        }
    }

    /// Backend error code when scoring failed inside the backend.
    #[must_use]
    pub fn scorer_code(&self) -> Option<ScorerErrorCode> {
        match self {
            Self::Core(err) => err.scorer_code(),
            _ => None,
        }
    }
}

/// One scored row of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    /// Text that was scored.
    pub sentence: String,
    /// Perplexity reported by the backend; `NaN` when the text had no
    /// scored token.
    pub perplexity: f64,
}

/// Summarises the outcome of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSummary {
    /// CSV file that was scored.
    pub csv_file: PathBuf,
    /// Model used for scoring.
    pub model: String,
    /// Column the scores were stored under.
    pub score_column: String,
    /// Number of backend calls made.
    pub batches: usize,
    /// Scored rows in file order.
    pub rows: Vec<ScoredRow>,
    /// Mean perplexity, absent when the file has no data rows.
    pub average: Option<f64>,
    /// Whether the CSV file was rewritten.
    pub written: bool,
}

/// Executes the run described by `cli` against the configured HTTP backend.
///
/// # Errors
/// Returns [`CliError`] when configuration, CSV handling, or scoring fails.
/// The CSV file is only rewritten once every batch has been scored.
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(config = field::Empty, dry_run = cli.dry_run),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    Span::current().record("config", field::display(cli.config.display()));
    let config = ScorerConfig::load(&cli.config, &cli.overrides())?;
    let scorer = OpenAiScorer::new(config.backend())?;
    run_with_scorer(&config, &scorer, cli.output_mode())
}

/// Scores the configured CSV column with `scorer` and stores the results.
///
/// # Errors
/// Returns [`CliError`] when the CSV cannot be read or written, the column is
/// missing, the score column would overwrite a data column, or any batch
/// fails. Nothing is written on error.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use pplcsv_cli::cli::{OutputMode, run_with_scorer};
/// # use pplcsv_cli::settings::{ConfigOverrides, ScorerConfig};
/// # use pplcsv_core::{Scorer, ScorerError};
/// # use tempfile::TempDir;
/// #
/// struct Words;
///
/// impl Scorer for Words {
///     fn name(&self) -> &str { "words" }
///     fn score(&self, _model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError> {
///         Ok(batch.iter().map(|text| text.split_whitespace().count() as f64).collect())
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let dir = TempDir::new()?;
/// let csv = dir.path().join("data.csv");
/// std::fs::write(&csv, "sentence\nhello world\n")?;
/// let ini = format!(
///     "[Config]\ncsv_file = {}\ncsv_sentence_header = sentence\nmodel_name = m\nbatch_size = 4\n",
///     csv.display()
/// );
/// let config = ScorerConfig::from_ini_str(&ini, &ConfigOverrides::default())?;
/// let summary = run_with_scorer(&config, &Words, OutputMode::Rewrite)?;
/// assert_eq!(summary.average, Some(2.0));
/// assert_eq!(std::fs::read_to_string(&csv)?, "sentence,Perplexity\nhello world,2.0\n");
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.execute",
    err,
    skip(config, scorer),
    fields(
        csv_file = field::Empty,
        scorer = scorer.name(),
        rows = field::Empty,
        batches = field::Empty,
        placement = field::Empty,
    ),
)]
pub fn run_with_scorer(
    config: &ScorerConfig,
    scorer: &dyn Scorer,
    mode: OutputMode,
) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    span.record("csv_file", field::display(config.csv_file.display()));

    let mut table = CsvTable::from_path(&config.csv_file, config.delimiter)?;
    let sentences = table.column(&config.csv_sentence_header)?;
    span.record("rows", sentences.len());
    let placement = table.score_column_placement(&config.score_column)?;
    span.record(
        "placement",
        match placement {
            ColumnPlacement::Appended => "appended",
            ColumnPlacement::Replaced => "replaced",
        },
    );

    let batch_scorer = BatchScorerBuilder::new()
        .with_batch_size(config.batch_size)
        .with_execution_strategy(config.execution_strategy())
        .build()?;
    let batches = batch_scorer.batch_count(sentences.len());
    span.record("batches", batches);

    let scores = batch_scorer.run(scorer, &config.model_name, &sentences)?;
    table.set_column(&config.score_column, format_scores(&scores))?;

    let written = match mode {
        OutputMode::Rewrite => {
            table.persist(&config.csv_file)?;
            true
        }
        OutputMode::DryRun => false,
    };

    let average = scores.average();
    info!(
        rows = scores.len(),
        batches,
        average = average.map(field::display),
        written,
        "command completed"
    );
    Ok(ExecutionSummary {
        csv_file: config.csv_file.clone(),
        model: config.model_name.clone(),
        score_column: config.score_column.clone(),
        batches,
        rows: sentences
            .into_iter()
            .zip(scores.iter().copied())
            .map(|(sentence, perplexity)| ScoredRow {
                sentence,
                perplexity,
            })
            .collect(),
        average,
        written,
    })
}

/// Renders scores as CSV cells: `2.0` rather than `2`, and an empty cell for
/// rows without a score.
fn format_scores(scores: &PerplexityScores) -> Vec<String> {
    scores
        .iter()
        .map(|score| {
            if score.is_nan() {
                String::new()
            } else {
                format!("{score:?}")
            }
        })
        .collect()
}

/// Renders `summary` to `writer` as plain text: a header block, one
/// `index<TAB>perplexity<TAB>sentence` line per row, and the average.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::io::Cursor;
/// # use pplcsv_cli::cli::{ExecutionSummary, ScoredRow, render_summary};
/// let summary = ExecutionSummary {
///     csv_file: "data.csv".into(),
///     model: "gpt2".into(),
///     score_column: "Perplexity".into(),
///     batches: 1,
///     rows: vec![ScoredRow { sentence: "hi there".into(), perplexity: 4.5 }],
///     average: Some(4.5),
///     written: true,
/// };
/// let mut buffer = Cursor::new(Vec::new());
/// render_summary(&summary, &mut buffer)?;
/// let text = String::from_utf8(buffer.into_inner()).expect("utf-8");
/// assert!(text.contains("0\t4.5\thi there\n"));
/// assert!(text.ends_with("average perplexity: 4.5\n"));
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "csv file: {}", summary.csv_file.display())?;
    writeln!(writer, "model: {}", summary.model)?;
    writeln!(writer, "rows: {}", summary.rows.len())?;
    writeln!(writer, "batches: {}", summary.batches)?;
    for (index, row) in summary.rows.iter().enumerate() {
        if row.perplexity.is_nan() {
            writeln!(writer, "{index}\tn/a\t{}", row.sentence)?;
        } else {
            writeln!(writer, "{index}\t{}\t{}", row.perplexity, row.sentence)?;
        }
    }
    if !summary.written {
        writeln!(writer, "dry run: `{}` left unchanged", summary.csv_file.display())?;
    }
    match summary.average {
        Some(average) => writeln!(writer, "average perplexity: {average}"),
        None => writeln!(writer, "average perplexity: n/a"),
    }
}
