//! pplcsv core library.
//!
//! Splits a column of texts into fixed-size batches, hands each batch to a
//! [`Scorer`] backend, and reassembles the perplexity values in row order.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod batch;
mod builder;
mod error;
mod result;
mod scorer;

#[cfg(test)]
mod test_utils;

pub use crate::{
    batch::BatchScorer,
    builder::{BatchScorerBuilder, ExecutionStrategy},
    error::{PplError, PplErrorCode, Result, ScorerError, ScorerErrorCode},
    result::PerplexityScores,
    scorer::Scorer,
};
