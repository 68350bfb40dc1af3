// Draft valuation and simulation engine.
//
// Player pool, turn order, roster assignment, VORP/VONA valuation, and the
// pick policies. No I/O beyond reading the player table.

pub mod draft;
pub mod error;
pub mod lookahead;
pub mod player;
pub mod policy;
pub mod pool;
pub mod valuation;

pub use error::{DraftError, LookaheadError, PoolError, ValuationError};
pub use player::{PlayerId, PlayerPool, PlayerRecord, Position, PositionTable, ScoringFormat};
