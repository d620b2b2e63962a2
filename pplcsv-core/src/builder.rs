//! Builder utilities for configuring batch scoring.
//!
//! Exposes the execution strategy selection surface and builder validation
//! used before constructing [`BatchScorer`] instances.

use std::num::NonZeroUsize;

use crate::{Result, batch::BatchScorer, error::PplError};

/// Indicates how [`BatchScorer::run`] dispatches batches to the backend.
///
/// Both strategies produce scores in row order. `Sequential` waits for each
/// batch before submitting the next; `Parallel` submits batches from a rayon
/// pool and is only available when the `parallel` feature is enabled.
///
/// # Examples
/// ```
/// use pplcsv_core::ExecutionStrategy;
///
/// let strategy = ExecutionStrategy::default();
/// assert_eq!(strategy, ExecutionStrategy::Sequential);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Score one batch at a time, in order.
    #[default]
    Sequential,
    /// Score batches concurrently and reassemble them in order.
    Parallel,
}

/// Configures and constructs [`BatchScorer`] instances.
///
/// # Examples
/// ```
/// use pplcsv_core::{BatchScorerBuilder, ExecutionStrategy};
///
/// let scorer = BatchScorerBuilder::new()
///     .with_batch_size(8)
///     .with_execution_strategy(ExecutionStrategy::Sequential)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(scorer.batch_size().get(), 8);
/// assert_eq!(scorer.execution_strategy(), ExecutionStrategy::Sequential);
/// ```
#[derive(Debug, Clone)]
pub struct BatchScorerBuilder {
    batch_size: usize,
    execution_strategy: ExecutionStrategy,
}

impl Default for BatchScorerBuilder {
    fn default() -> Self {
        Self {
            batch_size: 1,
            execution_strategy: ExecutionStrategy::Sequential,
        }
    }
}

impl BatchScorerBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use pplcsv_core::{BatchScorerBuilder, ExecutionStrategy};
    ///
    /// let builder = BatchScorerBuilder::new();
    /// assert_eq!(builder.batch_size(), 1);
    /// assert_eq!(builder.execution_strategy(), ExecutionStrategy::Sequential);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the number of texts submitted per backend call.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Returns the configured batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Sets the execution strategy to use when running.
    #[must_use]
    pub fn with_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution_strategy = strategy;
        self
    }

    /// Returns the currently configured execution strategy.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.execution_strategy
    }

    /// Validates the configuration and constructs a [`BatchScorer`].
    ///
    /// # Errors
    /// Returns [`PplError::InvalidBatchSize`] for a zero batch size and
    /// [`PplError::StrategyUnavailable`] when [`ExecutionStrategy::Parallel`]
    /// is requested without the `parallel` feature.
    ///
    /// # Examples
    /// ```
    /// use pplcsv_core::{BatchScorerBuilder, PplError};
    ///
    /// let err = BatchScorerBuilder::new().with_batch_size(0).build().unwrap_err();
    /// assert_eq!(err, PplError::InvalidBatchSize { got: 0 });
    /// ```
    pub fn build(self) -> Result<BatchScorer> {
        let batch_size = NonZeroUsize::new(self.batch_size).ok_or(PplError::InvalidBatchSize {
            got: self.batch_size,
        })?;

        #[cfg(not(feature = "parallel"))]
        if self.execution_strategy == ExecutionStrategy::Parallel {
            return Err(PplError::StrategyUnavailable {
                requested: ExecutionStrategy::Parallel,
            });
        }

        Ok(BatchScorer::new(batch_size, self.execution_strategy))
    }
}
