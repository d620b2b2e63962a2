//! Error types for the pplcsv core library.
//!
//! Defines error enums exposed by the public API and a convenient result alias.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::builder::ExecutionStrategy;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced by a [`crate::Scorer`] backend.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ScorerError {
    /// The backend does not serve the requested model.
    #[error("model `{model}` is not available on this backend")]
    UnknownModel {
        /// Model identifier that was rejected.
        model: String,
    },
    /// The backend refused to score the batch.
    #[error("backend rejected the batch: {message}")]
    Rejected {
        /// Diagnostic text reported by the backend.
        message: String,
    },
    /// The backend could not be reached or the exchange was interrupted.
    #[error("transport failure: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
    /// The backend replied with a payload that could not be interpreted.
    #[error("malformed backend response: {message}")]
    MalformedResponse {
        /// Description of what was missing or invalid.
        message: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`ScorerError`] variants.
    enum ScorerErrorCode for ScorerError {
        /// The backend does not serve the requested model.
        UnknownModel => UnknownModel { .. } => "SCORER_UNKNOWN_MODEL",
        /// The backend refused to score the batch.
        Rejected => Rejected { .. } => "SCORER_REJECTED",
        /// The backend could not be reached.
        Transport => Transport { .. } => "SCORER_TRANSPORT",
        /// The backend replied with an unreadable payload.
        MalformedResponse => MalformedResponse { .. } => "SCORER_MALFORMED_RESPONSE",
    }
}

/// Error type produced when constructing or running [`crate::BatchScorer`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum PplError {
    /// Batch size must be greater than zero.
    #[error("batch_size must be at least 1 (got {got})")]
    InvalidBatchSize {
        /// The invalid batch size supplied by the caller.
        got: usize,
    },
    /// The requested execution strategy is unavailable in the current build.
    #[error("the requested execution strategy {requested:?} is not available in this build")]
    StrategyUnavailable {
        /// Strategy that could not be satisfied by the current build.
        requested: ExecutionStrategy,
    },
    /// A [`crate::Scorer`] call failed for one batch.
    #[error("scorer `{scorer}` failed on batch {batch}: {error}")]
    Scorer {
        /// Identifier for the scorer that produced the error.
        scorer: Arc<str>,
        /// Zero-based index of the failing batch.
        batch: usize,
        #[source]
        /// Underlying backend error.
        error: ScorerError,
    },
    /// A [`crate::Scorer`] returned a different number of scores than texts.
    #[error("scorer `{scorer}` returned {actual} scores for batch {batch} of {expected} texts")]
    ScoreCountMismatch {
        /// Identifier for the misbehaving scorer.
        scorer: Arc<str>,
        /// Zero-based index of the batch.
        batch: usize,
        /// Number of texts submitted.
        expected: usize,
        /// Number of scores returned.
        actual: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`PplError`] variants.
    enum PplErrorCode for PplError {
        /// Batch size must be greater than zero.
        InvalidBatchSize => InvalidBatchSize { .. } => "PPL_INVALID_BATCH_SIZE",
        /// The requested execution strategy is unavailable in the current build.
        StrategyUnavailable => StrategyUnavailable { .. } => "PPL_STRATEGY_UNAVAILABLE",
        /// A [`crate::Scorer`] call failed for one batch.
        ScorerFailure => Scorer { .. } => "PPL_SCORER_FAILURE",
        /// A [`crate::Scorer`] returned the wrong number of scores.
        ScoreCountMismatch => ScoreCountMismatch { .. } => "PPL_SCORE_COUNT_MISMATCH",
    }
}

impl PplError {
    /// Retrieve the inner [`ScorerErrorCode`] when the error originated in a [`crate::Scorer`].
    pub const fn scorer_code(&self) -> Option<ScorerErrorCode> {
        match self {
            Self::Scorer { error, .. } => Some(error.code()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, PplError>;
