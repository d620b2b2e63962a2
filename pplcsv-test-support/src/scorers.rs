//! Deterministic scoring backends for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pplcsv_core::{Scorer, ScorerError};

/// Scores texts from a fixed lookup table and records every batch it sees.
///
/// Texts missing from the table are rejected, as is any model other than the
/// one the scorer was built for.
///
/// # Examples
/// ```
/// use pplcsv_core::Scorer;
/// use pplcsv_test_support::scorers::TableScorer;
///
/// let scorer = TableScorer::new("gpt2", [("hello world", 10.5), ("the cat sat", 22.3)]);
/// let scores = scorer.score("gpt2", &["the cat sat".into()]).expect("known text");
/// assert_eq!(scores, [22.3]);
/// assert_eq!(scorer.batches(), vec![vec!["the cat sat".to_owned()]]);
/// ```
#[derive(Debug, Clone)]
pub struct TableScorer {
    model: String,
    table: HashMap<String, f64>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl TableScorer {
    /// Creates a scorer serving `model` with the given text/score pairs.
    pub fn new<'a>(
        model: impl Into<String>,
        entries: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Self {
        Self {
            model: model.into(),
            table: entries
                .into_iter()
                .map(|(text, score)| (text.to_owned(), score))
                .collect(),
            batches: Arc::default(),
        }
    }

    /// Returns every batch submitted so far, in call order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<String>> {
        match self.batches.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, batch: &[String]) {
        let mut guard = match self.batches.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(batch.to_vec());
    }
}

impl Scorer for TableScorer {
    fn name(&self) -> &str {
        "table"
    }

    fn score(&self, model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError> {
        self.record(batch);
        if model != self.model {
            return Err(ScorerError::UnknownModel {
                model: model.to_owned(),
            });
        }
        batch
            .iter()
            .map(|text| {
                self.table
                    .get(text)
                    .copied()
                    .ok_or_else(|| ScorerError::Rejected {
                        message: format!("no score for `{text}`"),
                    })
            })
            .collect()
    }
}

/// Scores each text by its character count, for any model.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthScorer;

impl Scorer for LengthScorer {
    fn name(&self) -> &str {
        "length"
    }

    fn score(&self, _model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError> {
        Ok(batch
            .iter()
            .map(|text| text.chars().count() as f64)
            .collect())
    }
}

/// Fails every call with the configured error.
#[derive(Debug, Clone)]
pub struct FailingScorer {
    error: ScorerError,
}

impl FailingScorer {
    /// Creates a scorer that always returns `error`.
    #[must_use]
    pub fn new(error: ScorerError) -> Self {
        Self { error }
    }
}

impl Scorer for FailingScorer {
    fn name(&self) -> &str {
        "failing"
    }

    fn score(&self, _model: &str, _batch: &[String]) -> Result<Vec<f64>, ScorerError> {
        Err(self.error.clone())
    }
}
