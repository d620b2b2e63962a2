//! Shared test utilities for `pplcsv-core`.

use crate::{error::ScorerError, scorer::Scorer};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Scores each text by its character count and records every call.
#[derive(Debug, Default)]
pub(crate) struct CountingScorer {
    calls: Arc<AtomicUsize>,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
    fail_on_call: Option<usize>,
    drop_last: bool,
}

impl CountingScorer {
    /// Makes the scorer fail with [`ScorerError::Rejected`] on the given
    /// zero-based call.
    pub(crate) fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Makes the scorer return one score fewer than requested.
    pub(crate) fn dropping_last_score(mut self) -> Self {
        self.drop_last = true;
        self
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().expect("lock poisoned").clone()
    }
}

impl Scorer for CountingScorer {
    fn name(&self) -> &str {
        "counting"
    }

    fn score(&self, _model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        self.batch_sizes
            .lock()
            .expect("lock poisoned")
            .push(batch.len());
        if self.fail_on_call == Some(call) {
            return Err(ScorerError::Rejected {
                message: format!("call {call} rejected"),
            });
        }
        let mut scores: Vec<f64> = batch
            .iter()
            .map(|text| text.chars().count() as f64)
            .collect();
        if self.drop_last {
            scores.pop();
        }
        Ok(scores)
    }
}
