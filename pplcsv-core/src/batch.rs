//! Batch orchestration for the pplcsv library.
//!
//! Provides the [`BatchScorer`] runtime entry point, which chunks rows into
//! fixed-size batches, submits them to a [`Scorer`], and reassembles the
//! scores in row order.

use std::{num::NonZeroUsize, sync::Arc};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::{
    Result,
    builder::ExecutionStrategy,
    error::PplError,
    result::PerplexityScores,
    scorer::Scorer,
};

/// Entry point for scoring a column of texts.
///
/// # Examples
/// ```
/// use pplcsv_core::{BatchScorerBuilder, Scorer, ScorerError};
///
/// struct Words;
///
/// impl Scorer for Words {
///     fn name(&self) -> &str { "words" }
///     fn score(&self, _model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError> {
///         Ok(batch.iter().map(|t| t.split_whitespace().count() as f64).collect())
///     }
/// }
///
/// let runner = BatchScorerBuilder::new()
///     .with_batch_size(2)
///     .build()
///     .expect("builder must succeed");
/// let rows = vec!["hello world".to_owned(), "the cat sat".to_owned(), "hi".to_owned()];
/// let scores = runner.run(&Words, "demo", &rows).expect("run must succeed");
/// assert_eq!(scores.values(), [2.0, 3.0, 1.0]);
/// assert_eq!(runner.batch_count(rows.len()), 2);
/// ```
#[derive(Debug, Clone)]
pub struct BatchScorer {
    batch_size: NonZeroUsize,
    execution_strategy: ExecutionStrategy,
}

impl BatchScorer {
    pub(crate) fn new(batch_size: NonZeroUsize, execution_strategy: ExecutionStrategy) -> Self {
        Self {
            batch_size,
            execution_strategy,
        }
    }

    /// Returns the number of texts submitted per backend call.
    #[must_use]
    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Returns the execution strategy that will be used when running.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.execution_strategy
    }

    /// Returns how many backend calls scoring `rows` texts will make.
    ///
    /// # Examples
    /// ```
    /// use pplcsv_core::BatchScorerBuilder;
    ///
    /// let runner = BatchScorerBuilder::new().with_batch_size(4).build()?;
    /// assert_eq!(runner.batch_count(0), 0);
    /// assert_eq!(runner.batch_count(4), 1);
    /// assert_eq!(runner.batch_count(9), 3);
    /// # Ok::<(), pplcsv_core::PplError>(())
    /// ```
    #[must_use]
    pub fn batch_count(&self, rows: usize) -> usize {
        rows.div_ceil(self.batch_size.get())
    }

    /// Scores `rows` with `scorer`, one batch at a time or concurrently
    /// depending on the configured [`ExecutionStrategy`].
    ///
    /// Scores are returned in row order regardless of strategy. The first
    /// failing batch aborts the run; no partial result is returned.
    ///
    /// # Errors
    /// Returns [`PplError::Scorer`] when the backend fails on a batch and
    /// [`PplError::ScoreCountMismatch`] when it returns the wrong number of
    /// scores for a batch.
    #[instrument(
        name = "core.run",
        err,
        skip(self, scorer, model, rows),
        fields(
            scorer = %scorer.name(),
            model = %model,
            rows = rows.len(),
            batch_size = %self.batch_size,
            strategy = ?self.execution_strategy
        ),
    )]
    pub fn run<S: Scorer + ?Sized>(
        &self,
        scorer: &S,
        model: &str,
        rows: &[String],
    ) -> Result<PerplexityScores> {
        if rows.is_empty() {
            warn!(scorer = scorer.name(), "no rows to score");
            return Ok(PerplexityScores::from_values(Vec::new()));
        }

        let values = match self.execution_strategy {
            ExecutionStrategy::Sequential => self.run_sequential(scorer, model, rows)?,
            #[cfg(feature = "parallel")]
            ExecutionStrategy::Parallel => self.run_parallel(scorer, model, rows)?,
            #[cfg(not(feature = "parallel"))]
            ExecutionStrategy::Parallel => {
                return Err(PplError::StrategyUnavailable {
                    requested: ExecutionStrategy::Parallel,
                });
            }
        };

        info!(
            rows = values.len(),
            batches = self.batch_count(rows.len()),
            "scoring completed"
        );
        Ok(PerplexityScores::from_values(values))
    }

    fn run_sequential<S: Scorer + ?Sized>(
        &self,
        scorer: &S,
        model: &str,
        rows: &[String],
    ) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(rows.len());
        for (batch, chunk) in rows.chunks(self.batch_size.get()).enumerate() {
            values.extend(score_batch(scorer, model, batch, chunk)?);
        }
        Ok(values)
    }

    #[cfg(feature = "parallel")]
    fn run_parallel<S: Scorer + ?Sized>(
        &self,
        scorer: &S,
        model: &str,
        rows: &[String],
    ) -> Result<Vec<f64>> {
        // Indexed collect keeps batches in submission order.
        let batches = rows
            .par_chunks(self.batch_size.get())
            .enumerate()
            .map(|(batch, chunk)| score_batch(scorer, model, batch, chunk))
            .collect::<Result<Vec<_>>>()?;
        Ok(batches.into_iter().flatten().collect())
    }
}

fn score_batch<S: Scorer + ?Sized>(
    scorer: &S,
    model: &str,
    batch: usize,
    chunk: &[String],
) -> Result<Vec<f64>> {
    debug!(batch, size = chunk.len(), "scoring batch");
    let scores = scorer
        .score(model, chunk)
        .map_err(|error| PplError::Scorer {
            scorer: Arc::from(scorer.name()),
            batch,
            error,
        })?;
    if scores.len() != chunk.len() {
        return Err(PplError::ScoreCountMismatch {
            scorer: Arc::from(scorer.name()),
            batch,
            expected: chunk.len(),
            actual: scores.len(),
        });
    }
    Ok(scores)
}
