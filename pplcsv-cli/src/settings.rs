//! INI configuration loading and validation.
//!
//! The run is described by the `[Config]` section of an INI file. Values are
//! read as strings, command-line overrides are layered on top, and the
//! result is validated into a [`ScorerConfig`].
//!
//! Values are taken literally: backslashes carry no escape meaning, so
//! `delimiter = \t` and `csv_file = C:\data\input.csv` keep every character,
//! and quotes are part of the value. Lines starting with `;` or `#` are
//! comments; inline comments are not recognised. Option names are matched
//! case-insensitively.

use std::{
    env, error, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use ::config::{Config, File, FileStoredFormat, Format, Map, Value, ValueKind};
use ini::{Ini, ParseOption};
use pplcsv_core::ExecutionStrategy;
use pplcsv_providers_csv::parse_delimiter;
use pplcsv_providers_openai::{DEFAULT_API_BASE, OpenAiConfig};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Column name used for scores unless `score_column` says otherwise.
pub const DEFAULT_SCORE_COLUMN: &str = "Perplexity";

/// Environment variable consulted when the file carries no `api_key`.
pub const API_KEY_ENV: &str = "PPLCSV_API_KEY";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration `{path}`: {source}")]
    Read {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file is not valid INI.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ::config::ConfigError),
    /// A required key is absent or blank.
    #[error("missing required key `{key}` in the [Config] section")]
    MissingKey {
        /// Name of the missing key.
        key: &'static str,
    },
    /// A key holds a value that cannot be used.
    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        /// Name of the offending key.
        key: &'static str,
        /// Raw value as written.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "CONFIG_READ",
            Self::Parse(_) => "CONFIG_PARSE",
            Self::MissingKey { .. } => "CONFIG_MISSING_KEY",
            Self::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
        }
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replacement for `delimiter`.
    pub delimiter: Option<String>,
    /// Replacement for `batch_size`.
    pub batch_size: Option<usize>,
    /// Replacement for `model_name`.
    pub model_name: Option<String>,
    /// Replacement for `score_column`.
    pub score_column: Option<String>,
    /// Forces parallel scoring when set.
    pub parallel: bool,
}

/// Validated settings for one scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    /// CSV file to read and rewrite.
    pub csv_file: PathBuf,
    /// Column holding the texts to score.
    pub csv_sentence_header: String,
    /// Model identifier passed to the backend.
    pub model_name: String,
    /// Number of texts per backend call; always at least 1.
    pub batch_size: usize,
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Column receiving the scores.
    pub score_column: String,
    /// Base URL of the completion server.
    pub api_base: String,
    /// Bearer token for the completion server.
    pub api_key: Option<String>,
    /// Per-request timeout; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Whether batches are scored concurrently.
    pub parallel: bool,
}

/// INI format for the `config` crate that reads values verbatim.
#[derive(Debug, Clone, Copy)]
struct LiteralIni;

impl Format for LiteralIni {
    fn parse(
        &self,
        uri: Option<&String>,
        text: &str,
    ) -> Result<Map<String, Value>, Box<dyn error::Error + Send + Sync>> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
        };
        let parsed = Ini::load_from_str_opt(text, options)?;
        let mut root = Map::new();
        for (section, properties) in parsed.iter() {
            let entries = properties.iter().map(|(key, value)| {
                (
                    key.to_lowercase(),
                    Value::new(uri, ValueKind::String(value.to_owned())),
                )
            });
            match section {
                Some(name) => {
                    let table = ValueKind::Table(entries.collect());
                    root.insert(name.to_owned(), Value::new(uri, table));
                }
                None => root.extend(entries),
            }
        }
        Ok(root)
    }
}

impl FileStoredFormat for LiteralIni {
    fn file_extensions(&self) -> &'static [&'static str] {
        &["ini"]
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawFile {
    #[serde(default, rename = "config", alias = "Config")]
    section: RawSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSection {
    csv_file: Option<String>,
    csv_sentence_header: Option<String>,
    model_name: Option<String>,
    batch_size: Option<String>,
    delimiter: Option<String>,
    score_column: Option<String>,
    api_base: Option<String>,
    api_key: Option<String>,
    request_timeout_secs: Option<String>,
    parallel: Option<String>,
}

impl RawSection {
    fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(delimiter) = &overrides.delimiter {
            self.delimiter = Some(delimiter.clone());
        }
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = Some(batch_size.to_string());
        }
        if let Some(model) = &overrides.model_name {
            self.model_name = Some(model.clone());
        }
        if let Some(column) = &overrides.score_column {
            self.score_column = Some(column.clone());
        }
        if overrides.parallel {
            self.parallel = Some("true".to_owned());
        }
    }
}

impl ScorerConfig {
    /// Reads the INI file at `path`, applies `overrides`, and validates the
    /// result. A missing `api_key` falls back to `PPLCSV_API_KEY`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] when the file cannot be read and any
    /// error surfaced by [`Self::from_ini_str`].
    #[instrument(name = "cli.load_config", err, skip(overrides))]
    pub fn load(path: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_ini_str(&contents, overrides)?;
        config.api_key = fallback_api_key(config.api_key, env::var(API_KEY_ENV).ok());
        debug!(
            csv_file = %config.csv_file.display(),
            model = config.model_name.as_str(),
            batch_size = config.batch_size,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parses INI `contents`, applies `overrides`, and validates the result.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed INI,
    /// [`ConfigError::MissingKey`] for absent required keys, and
    /// [`ConfigError::InvalidValue`] for unusable values.
    ///
    /// # Examples
    /// ```
    /// use pplcsv_cli::settings::{ConfigOverrides, ScorerConfig};
    ///
    /// let ini = "[Config]\ncsv_file = data.csv\ncsv_sentence_header = sentence\n\
    ///            model_name = gpt2\nbatch_size = 8\n";
    /// let config = ScorerConfig::from_ini_str(ini, &ConfigOverrides::default())?;
    /// assert_eq!(config.batch_size, 8);
    /// assert_eq!(config.delimiter, b',');
    /// assert_eq!(config.score_column, "Perplexity");
    /// # Ok::<(), pplcsv_cli::settings::ConfigError>(())
    /// ```
    pub fn from_ini_str(contents: &str, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let raw: RawFile = Config::builder()
            .add_source(File::from_str(contents, LiteralIni))
            .build()?
            .try_deserialize()?;
        let mut section = raw.section;
        section.apply(overrides);
        Self::validate(section)
    }

    fn validate(raw: RawSection) -> Result<Self, ConfigError> {
        let csv_file = PathBuf::from(required("csv_file", raw.csv_file)?);
        let csv_sentence_header = required("csv_sentence_header", raw.csv_sentence_header)?;
        let model_name = required("model_name", raw.model_name)?;
        let batch_size = parse_batch_size(&required("batch_size", raw.batch_size)?)?;

        let delimiter = match raw.delimiter {
            Some(value) => parse_delimiter(&value).map_err(|err| ConfigError::InvalidValue {
                key: "delimiter",
                value,
                reason: err.to_string(),
            })?,
            None => b',',
        };

        let score_column = optional(raw.score_column)
            .unwrap_or_else(|| DEFAULT_SCORE_COLUMN.to_owned());
        if score_column == csv_sentence_header {
            return Err(ConfigError::InvalidValue {
                key: "score_column",
                value: score_column,
                reason: "would overwrite the sentence column".to_owned(),
            });
        }

        let api_base = optional(raw.api_base).unwrap_or_else(|| DEFAULT_API_BASE.to_owned());
        let request_timeout = optional(raw.request_timeout_secs)
            .map(|value| parse_timeout(&value))
            .transpose()?;
        let parallel = optional(raw.parallel)
            .map(|value| parse_flag("parallel", &value))
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            csv_file,
            csv_sentence_header,
            model_name,
            batch_size,
            delimiter,
            score_column,
            api_base,
            api_key: optional(raw.api_key),
            request_timeout,
            parallel,
        })
    }

    /// Returns the batch execution strategy selected by `parallel`.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        if self.parallel {
            ExecutionStrategy::Parallel
        } else {
            ExecutionStrategy::Sequential
        }
    }

    /// Returns the connection settings for the completion server.
    #[must_use]
    pub fn backend(&self) -> OpenAiConfig {
        OpenAiConfig::new(self.api_base.clone())
            .with_api_key(self.api_key.clone())
            .with_timeout(self.request_timeout)
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required(key: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    optional(value).ok_or(ConfigError::MissingKey { key })
}

fn parse_batch_size(value: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: "batch_size",
        value: value.to_owned(),
        reason: reason.to_owned(),
    };
    match value.parse::<usize>() {
        Ok(0) => Err(invalid("must be at least 1")),
        Ok(size) => Ok(size),
        Err(_) => Err(invalid("expected a positive integer")),
    }
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            key: "request_timeout_secs",
            value: value.to_owned(),
            reason: "expected a positive number of seconds".to_owned(),
        }),
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
            reason: "expected true or false".to_owned(),
        }),
    }
}

fn fallback_api_key(configured: Option<String>, from_env: Option<String>) -> Option<String> {
    configured.or_else(|| optional(from_env))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const BASE: &str = "[Config]\n\
        csv_file = data.csv\n\
        csv_sentence_header = sentence\n\
        model_name = gpt2\n\
        batch_size = 1\n";

    #[fixture]
    fn no_overrides() -> ConfigOverrides {
        ConfigOverrides::default()
    }

    fn with_extra(extra: &str) -> String {
        format!("{BASE}{extra}\n")
    }

    #[rstest]
    fn minimal_file_uses_defaults(no_overrides: ConfigOverrides) {
        let config = ScorerConfig::from_ini_str(BASE, &no_overrides).expect("valid config");
        assert_eq!(
            config,
            ScorerConfig {
                csv_file: PathBuf::from("data.csv"),
                csv_sentence_header: "sentence".to_owned(),
                model_name: "gpt2".to_owned(),
                batch_size: 1,
                delimiter: b',',
                score_column: DEFAULT_SCORE_COLUMN.to_owned(),
                api_base: DEFAULT_API_BASE.to_owned(),
                api_key: None,
                request_timeout: None,
                parallel: false,
            }
        );
        assert_eq!(config.execution_strategy(), ExecutionStrategy::Sequential);
    }

    #[rstest]
    fn optional_keys_are_read(no_overrides: ConfigOverrides) {
        let ini = with_extra(
            "delimiter = tab\nscore_column = ppl\napi_base = http://gpu:9000/v1\n\
             api_key = sk-file\nrequest_timeout_secs = 30\nparallel = yes",
        );
        let config = ScorerConfig::from_ini_str(&ini, &no_overrides).expect("valid config");
        assert_eq!(config.delimiter, b'\t');
        assert_eq!(config.score_column, "ppl");
        assert_eq!(config.api_base, "http://gpu:9000/v1");
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.execution_strategy(), ExecutionStrategy::Parallel);
        assert_eq!(
            config.backend().completions_url(),
            "http://gpu:9000/v1/completions"
        );
    }

    #[rstest]
    #[case::escaped_tab(r"delimiter = \t", b'\t')]
    #[case::semicolon("delimiter = ;", b';')]
    #[case::hash("delimiter = #", b'#')]
    #[case::colon("delimiter: |", b'|')]
    fn delimiter_is_read_verbatim(
        no_overrides: ConfigOverrides,
        #[case] line: &str,
        #[case] expected: u8,
    ) {
        let config =
            ScorerConfig::from_ini_str(&with_extra(line), &no_overrides).expect("valid config");
        assert_eq!(config.delimiter, expected);
    }

    #[rstest]
    #[case::relative(r"data\new.csv")]
    #[case::windows(r"C:\data\x.csv")]
    #[case::unc(r"\\share\corpus\sentences.csv")]
    fn backslashes_in_paths_are_kept(no_overrides: ConfigOverrides, #[case] path: &str) {
        let ini = format!(
            "[Config]\ncsv_file = {path}\ncsv_sentence_header = sentence\n\
             model_name = gpt2\nbatch_size = 1\n"
        );
        let config = ScorerConfig::from_ini_str(&ini, &no_overrides).expect("valid config");
        assert_eq!(config.csv_file, PathBuf::from(path));
    }

    #[rstest]
    fn comments_quotes_and_key_case(no_overrides: ConfigOverrides) {
        let ini = "; run settings\n\
            # scored nightly\n\
            [Config]\n\
            CSV_File = data.csv\n\
            csv_sentence_header = sentence\n\
            ; model comes from the hub\n\
            model_name = \"gpt2\"\n\
            batch_size = 4\n\
            score_column = 'ppl'\n";
        let config = ScorerConfig::from_ini_str(ini, &no_overrides).expect("valid config");
        assert_eq!(config.csv_file, PathBuf::from("data.csv"));
        assert_eq!(config.model_name, "\"gpt2\"");
        assert_eq!(config.score_column, "'ppl'");
        assert_eq!(config.batch_size, 4);
    }

    #[rstest]
    fn overrides_take_precedence() {
        let overrides = ConfigOverrides {
            delimiter: Some("|".to_owned()),
            batch_size: Some(16),
            model_name: Some("opt-125m".to_owned()),
            score_column: Some("score".to_owned()),
            parallel: true,
        };
        let config = ScorerConfig::from_ini_str(BASE, &overrides).expect("valid config");
        assert_eq!(config.delimiter, b'|');
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.model_name, "opt-125m");
        assert_eq!(config.score_column, "score");
        assert!(config.parallel);
    }

    #[rstest]
    #[case::csv_file("csv_file")]
    #[case::header("csv_sentence_header")]
    #[case::model("model_name")]
    #[case::batch("batch_size")]
    fn missing_required_key_is_reported(no_overrides: ConfigOverrides, #[case] key: &str) {
        let ini: String = BASE
            .lines()
            .filter(|line| !line.starts_with(key))
            .map(|line| format!("{line}\n"))
            .collect();
        let err = ScorerConfig::from_ini_str(&ini, &no_overrides).expect_err("key is required");
        assert!(
            matches!(err, ConfigError::MissingKey { key: missing } if missing == key),
            "{err:?}"
        );
        assert_eq!(err.code(), "CONFIG_MISSING_KEY");
    }

    #[rstest]
    fn missing_section_reports_first_required_key(no_overrides: ConfigOverrides) {
        let err = ScorerConfig::from_ini_str("[Other]\nkey = value\n", &no_overrides)
            .expect_err("section is required");
        assert!(matches!(err, ConfigError::MissingKey { key: "csv_file" }));
    }

    #[rstest]
    #[case::zero_batch("batch_size", "batch_size = 0")]
    #[case::negative_batch("batch_size", "batch_size = -2")]
    #[case::word_batch("batch_size", "batch_size = many")]
    #[case::long_delimiter("delimiter", "delimiter = ::")]
    #[case::timeout("request_timeout_secs", "request_timeout_secs = soon")]
    #[case::flag("parallel", "parallel = sometimes")]
    #[case::clobbering_column("score_column", "score_column = sentence")]
    fn invalid_values_are_rejected(
        no_overrides: ConfigOverrides,
        #[case] key: &str,
        #[case] line: &str,
    ) {
        let ini: String = BASE
            .lines()
            .filter(|existing| !existing.starts_with(key))
            .map(|existing| format!("{existing}\n"))
            .chain(std::iter::once(format!("{line}\n")))
            .collect();
        let err = ScorerConfig::from_ini_str(&ini, &no_overrides).expect_err("value is invalid");
        assert!(
            matches!(&err, ConfigError::InvalidValue { key: rejected, .. } if *rejected == key),
            "{err:?}"
        );
        assert_eq!(err.code(), "CONFIG_INVALID_VALUE");
    }

    #[rstest]
    fn zero_batch_size_override_is_rejected() {
        let overrides = ConfigOverrides {
            batch_size: Some(0),
            ..ConfigOverrides::default()
        };
        let err = ScorerConfig::from_ini_str(BASE, &overrides).expect_err("zero is invalid");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "batch_size",
                ..
            }
        ));
    }

    #[rstest]
    #[case(None, Some("sk-env"), Some("sk-env"))]
    #[case(Some("sk-file"), Some("sk-env"), Some("sk-file"))]
    #[case(None, Some("  "), None)]
    #[case(None, None, None)]
    fn api_key_falls_back_to_environment(
        #[case] configured: Option<&str>,
        #[case] from_env: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let resolved = fallback_api_key(
            configured.map(str::to_owned),
            from_env.map(str::to_owned),
        );
        assert_eq!(resolved.as_deref(), expected);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ScorerConfig::load(
            Path::new("/definitely/not/here/pplcsv.ini"),
            &ConfigOverrides::default(),
        )
        .expect_err("file is missing");
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.code(), "CONFIG_READ");
    }
}
