//! Scoring backend abstraction for the pplcsv core runtime.

use crate::error::ScorerError;

/// A backend that turns texts into perplexity values.
///
/// Implementations receive the model identifier verbatim from configuration
/// and must return exactly one score per text, in submission order. The
/// [`crate::BatchScorer`] verifies the length and reports
/// [`crate::PplError::ScoreCountMismatch`] otherwise.
///
/// Backends are shared across worker threads when batches are scored in
/// parallel, hence the `Send + Sync` bound.
///
/// # Examples
/// ```
/// use pplcsv_core::{Scorer, ScorerError};
///
/// struct Length;
///
/// impl Scorer for Length {
///     fn name(&self) -> &str { "length" }
///     fn score(&self, _model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError> {
///         Ok(batch.iter().map(|text| text.len() as f64).collect())
///     }
/// }
///
/// let scores = Length.score("any", &["ab".into(), "abcd".into()])?;
/// assert_eq!(scores, [2.0, 4.0]);
/// assert_eq!(Length.name(), "length");
/// # Ok::<(), ScorerError>(())
/// ```
pub trait Scorer: Send + Sync {
    /// Returns a human-readable backend name used in diagnostics.
    fn name(&self) -> &str;

    /// Scores `batch` with the model identified by `model`.
    ///
    /// # Errors
    /// Returns [`ScorerError::UnknownModel`] when the backend does not serve
    /// `model`, and any other [`ScorerError`] when the batch cannot be scored.
    fn score(&self, model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError>;
}

impl<S: Scorer + ?Sized> Scorer for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError> {
        (**self).score(model, batch)
    }
}

impl<S: Scorer + ?Sized> Scorer for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError> {
        (**self).score(model, batch)
    }
}
