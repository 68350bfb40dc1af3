// Draft mechanics: turn order, rosters, and the drafted/available state.

pub mod roster;
pub mod schedule;
pub mod state;

pub use roster::{RosterSlot, RosterTemplate, TeamRoster};
pub use schedule::{DraftOrder, PickOrderTable, PickSchedule};
pub use state::{DraftSettings, DraftState, DraftStatus};
