// Roster templates and slot assignment.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::player::{PlayerId, PlayerPool, Position};

const FLEX_PREFIX: &str = "FLEX";
const BENCH_PREFIX: &str = "BN";

/// Ordered list of roster slot names, e.g. `["QB1", "RB1", ..., "BN8"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterTemplate(pub Vec<String>);

impl Default for RosterTemplate {
    fn default() -> Self {
        let mut slots: Vec<String> = [
            "QB1", "RB1", "RB2", "WR1", "WR2", "TE1", "FLEX1", "FLEX2", "K", "DEF",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        slots.extend((1..=8).map(|i| format!("BN{}", i)));
        RosterTemplate(slots)
    }
}

impl RosterTemplate {
    pub fn slots(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of dedicated starting slots for `position`.
    pub fn starter_count(&self, position: Position) -> usize {
        self.0
            .iter()
            .filter(|name| is_dedicated_slot(name, position))
            .count()
    }

    pub fn flex_count(&self) -> usize {
        self.0.iter().filter(|name| name.starts_with(FLEX_PREFIX)).count()
    }
}

fn is_dedicated_slot(name: &str, position: Position) -> bool {
    name.starts_with(position.display_str())
}

/// A named slot holding at most one player. Filled once, never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterSlot {
    pub name: String,
    pub player: Option<PlayerId>,
}

/// One team's slot assignments, in template order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRoster {
    pub slots: Vec<RosterSlot>,
}

impl TeamRoster {
    pub fn new(template: &RosterTemplate) -> Self {
        TeamRoster {
            slots: template
                .slots()
                .iter()
                .map(|name| RosterSlot {
                    name: name.clone(),
                    player: None,
                })
                .collect(),
        }
    }

    /// Place a drafted player.
    ///
    /// Slot priority:
    /// 1. Empty dedicated slot for the exact position
    /// 2. Empty FLEX slot (RB/WR/TE only)
    /// 3. Empty bench slot
    ///
    /// Returns `false` and leaves the roster unchanged when nothing fits.
    pub fn assign(&mut self, player: PlayerId, position: Position) -> bool {
        let index = self
            .first_empty(|name| is_dedicated_slot(name, position))
            .or_else(|| {
                if position.is_flex_eligible() {
                    self.first_empty(|name| name.starts_with(FLEX_PREFIX))
                } else {
                    None
                }
            })
            .or_else(|| self.first_empty(|name| name.starts_with(BENCH_PREFIX)));

        match index {
            Some(i) => {
                self.slots[i].player = Some(player);
                true
            }
            None => {
                warn!(
                    "no open roster slot for {:?} at {}; assignment skipped",
                    player, position
                );
                false
            }
        }
    }

    fn first_empty(&self, matches: impl Fn(&str) -> bool) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.player.is_none() && matches(&s.name))
    }

    /// Positions whose dedicated starting slots are not all filled.
    pub fn unfilled_positions(&self) -> Vec<Position> {
        Position::ALL
            .iter()
            .copied()
            .filter(|&pos| {
                self.slots
                    .iter()
                    .any(|s| s.player.is_none() && is_dedicated_slot(&s.name, pos))
            })
            .collect()
    }

    /// Rostered players whose pool position is `position`, bench included.
    pub fn count_at_position(&self, position: Position, pool: &PlayerPool) -> usize {
        self.players()
            .filter(|&id| pool.get(id).position == position)
            .count()
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.slots.iter().filter_map(|s| s.player)
    }

    pub fn filled_count(&self) -> usize {
        self.players().count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{FormatValues, PlayerRow};

    fn template(names: &[&str]) -> RosterTemplate {
        RosterTemplate(names.iter().map(|s| s.to_string()).collect())
    }

    fn slot_of(roster: &TeamRoster, id: PlayerId) -> &str {
        &roster
            .slots
            .iter()
            .find(|s| s.player == Some(id))
            .unwrap()
            .name
    }

    #[test]
    fn default_template_layout() {
        let t = RosterTemplate::default();
        assert_eq!(t.len(), 18);
        assert_eq!(t.starter_count(Position::RunningBack), 2);
        assert_eq!(t.starter_count(Position::Quarterback), 1);
        assert_eq!(t.starter_count(Position::Defense), 1);
        assert_eq!(t.flex_count(), 2);
    }

    #[test]
    fn dedicated_slot_first() {
        let mut roster = TeamRoster::new(&RosterTemplate::default());
        assert!(roster.assign(PlayerId(0), Position::RunningBack));
        assert!(roster.assign(PlayerId(1), Position::RunningBack));
        assert_eq!(slot_of(&roster, PlayerId(0)), "RB1");
        assert_eq!(slot_of(&roster, PlayerId(1)), "RB2");
    }

    #[test]
    fn wr_overflow_goes_to_flex_before_bench() {
        let mut roster = TeamRoster::new(&RosterTemplate::default());
        roster.assign(PlayerId(0), Position::WideReceiver);
        roster.assign(PlayerId(1), Position::WideReceiver);
        roster.assign(PlayerId(2), Position::WideReceiver);
        roster.assign(PlayerId(3), Position::TightEnd);
        roster.assign(PlayerId(4), Position::TightEnd);
        roster.assign(PlayerId(5), Position::WideReceiver);
        assert_eq!(slot_of(&roster, PlayerId(2)), "FLEX1");
        assert_eq!(slot_of(&roster, PlayerId(4)), "FLEX2");
        assert_eq!(slot_of(&roster, PlayerId(5)), "BN1");
    }

    #[test]
    fn quarterback_skips_flex() {
        let mut roster = TeamRoster::new(&RosterTemplate::default());
        roster.assign(PlayerId(0), Position::Quarterback);
        roster.assign(PlayerId(1), Position::Quarterback);
        assert_eq!(slot_of(&roster, PlayerId(1)), "BN1");
    }

    #[test]
    fn full_roster_reports_failure_without_change() {
        let mut roster = TeamRoster::new(&template(&["QB1", "K"]));
        assert!(roster.assign(PlayerId(0), Position::Quarterback));
        let before = roster.clone();
        assert!(!roster.assign(PlayerId(1), Position::Quarterback));
        assert!(!roster.assign(PlayerId(2), Position::WideReceiver));
        assert_eq!(roster, before);
    }

    #[test]
    fn unfilled_positions_excludes_bench_and_flex() {
        let mut roster = TeamRoster::new(&template(&["QB1", "RB1", "FLEX1", "BN1"]));
        assert_eq!(
            roster.unfilled_positions(),
            vec![Position::Quarterback, Position::RunningBack]
        );
        roster.assign(PlayerId(0), Position::RunningBack);
        assert_eq!(roster.unfilled_positions(), vec![Position::Quarterback]);
    }

    #[test]
    fn count_at_position_reads_pool() {
        let row = |name: &str, pos| PlayerRow {
            display_name: name.into(),
            position: pos,
            external_id: None,
            points: FormatValues {
                std: Some(100.0),
                half_ppr: None,
                ppr: None,
            },
            adp: FormatValues::default(),
        };
        let pool = PlayerPool::from_rows(vec![
            row("Qb One", Position::Quarterback),
            row("Qb Two", Position::Quarterback),
            row("Wr One", Position::WideReceiver),
        ]);
        let mut roster = TeamRoster::new(&RosterTemplate::default());
        roster.assign(PlayerId(0), Position::Quarterback);
        roster.assign(PlayerId(1), Position::Quarterback);
        roster.assign(PlayerId(2), Position::WideReceiver);
        assert_eq!(roster.count_at_position(Position::Quarterback, &pool), 2);
        assert_eq!(roster.count_at_position(Position::TightEnd, &pool), 0);
        assert_eq!(roster.filled_count(), 3);
    }
}
