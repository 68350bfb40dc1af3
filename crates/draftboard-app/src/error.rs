// Session-level error taxonomy.

use draftboard_core::{DraftError, LookaheadError, PoolError, ValuationError};
use thiserror::Error;

use crate::live::LiveError;

/// Failures surfaced by `SessionManager` operations. Every variant is a
/// structured result for the caller; none of them poison the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Valuation(#[from] ValuationError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("pick slot {slot} has no roster id in the live draft")]
    UnresolvedRoster { slot: u32 },

    #[error("live draft provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("operation requires a simulated session")]
    NotSimulated,

    #[error("operation requires a live session")]
    NotLive,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<LookaheadError> for SessionError {
    fn from(e: LookaheadError) -> Self {
        match e {
            LookaheadError::Draft(d) => SessionError::Draft(d),
            LookaheadError::Valuation(v) => SessionError::Valuation(v),
        }
    }
}

impl From<LiveError> for SessionError {
    fn from(e: LiveError) -> Self {
        SessionError::UpstreamUnavailable(e.to_string())
    }
}
