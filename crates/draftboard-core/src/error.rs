// Error taxonomy for the draft engine.

use thiserror::Error;

/// Failures of a single pick attempt against a `DraftState`.
///
/// A failed attempt never mutates the drafted set or the pick cursor, so a
/// retry with a corrected name is always safe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("player not found: {name}")]
    NotFound { name: String },

    #[error("player already drafted: {name}")]
    AlreadyDrafted { name: String },

    #[error("draft is complete")]
    DraftComplete,
}

/// Failures of the valuation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValuationError {
    #[error("unsupported scoring format: {format}")]
    UnsupportedFormat { format: String },

    #[error("player pool has no `{column}` column")]
    MissingColumn { column: String },
}

/// Failures while loading the player pool from its provider.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

/// Failures inside a lookahead branch. The live state is never touched, so
/// these only ever describe the branch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookaheadError {
    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Valuation(#[from] ValuationError),
}
