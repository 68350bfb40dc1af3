// Valuation engine: replacement-level VORP and positional scarcity.

pub mod scarcity;
pub mod vorp;

pub use vorp::{compute_vorp, replacement_index, ValuationEngine};
