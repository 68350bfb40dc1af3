// Value Over Replacement Player.
//
// A player's VORP is their projected points minus the points of the
// replacement-level player at the same position, where replacement level is
// the first player who would not start in a league of this size.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::draft::roster::RosterTemplate;
use crate::draft::state::DraftState;
use crate::error::ValuationError;
use crate::player::{PlayerId, Position, PositionTable};

/// Share of FLEX slots attributed to each of RB and WR.
const FLEX_SHARE: f64 = 0.5;

/// Default per-position multipliers. Single-QB leagues discount quarterbacks.
pub fn default_adjustments() -> PositionTable<f64> {
    let mut table = PositionTable::uniform(1.0);
    table.QB = 0.8;
    table
}

/// 0-based index of the replacement-level player at `position`.
///
/// Starters times teams, plus half the league's FLEX slots for RB and WR.
pub fn replacement_index(position: Position, template: &RosterTemplate, team_count: usize) -> usize {
    let starters = template.starter_count(position) * team_count;
    let flex = match position {
        Position::RunningBack | Position::WideReceiver => {
            (FLEX_SHARE * (template.flex_count() * team_count) as f64).floor() as usize
        }
        _ => 0,
    };
    starters + flex
}

/// Replacement value from points sorted descending. Zero when the position
/// is shallower than the index.
pub fn replacement_value(sorted_points: &[f64], index: usize) -> f64 {
    sorted_points.get(index).copied().unwrap_or(0.0)
}

/// Recompute VORP for the available players at `position` only. Other
/// positions' values are left as they are.
pub fn compute_vorp(
    state: &mut DraftState,
    position: Position,
    template: &RosterTemplate,
    team_count: usize,
    adjustment: f64,
) -> Result<(), ValuationError> {
    let format = state.format();
    state.pool().require_points(format)?;

    let mut ranked: Vec<(PlayerId, f64)> = state
        .available_players()
        .filter(|p| p.position == position)
        .map(|p| (p.id, p.points(format)))
        .collect();
    // Stable: equal points keep pool order.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let index = replacement_index(position, template, team_count);
    let sorted_points: Vec<f64> = ranked.iter().map(|(_, pts)| *pts).collect();
    let baseline = replacement_value(&sorted_points, index);

    debug!(
        "VORP {}: {} available, replacement index {}, baseline {:.1}",
        position,
        ranked.len(),
        index,
        baseline
    );

    for (id, pts) in ranked {
        state.set_vorp(id, (pts - baseline) * adjustment);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// League-shaped VORP calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationEngine {
    pub template: RosterTemplate,
    pub team_count: usize,
    pub adjustments: PositionTable<f64>,
}

impl ValuationEngine {
    pub fn new(template: RosterTemplate, team_count: usize) -> Self {
        ValuationEngine {
            template,
            team_count,
            adjustments: default_adjustments(),
        }
    }

    pub fn with_adjustments(mut self, adjustments: PositionTable<f64>) -> Self {
        self.adjustments = adjustments;
        self
    }

    /// Recompute VORP for every skill position over the available pool.
    pub fn refresh(&self, state: &mut DraftState) -> Result<(), ValuationError> {
        for position in Position::SKILL {
            compute_vorp(
                state,
                position,
                &self.template,
                self.team_count,
                self.adjustments.get(position),
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::schedule::DraftOrder;
    use crate::draft::state::DraftSettings;
    use crate::player::{FormatValues, PlayerPool, PlayerRow, ScoringFormat};
    use std::sync::Arc;

    fn row(name: &str, pos: Position, pts: f64) -> PlayerRow {
        PlayerRow {
            display_name: name.into(),
            position: pos,
            external_id: None,
            points: FormatValues {
                std: Some(pts),
                half_ppr: None,
                ppr: None,
            },
            adp: FormatValues::default(),
        }
    }

    fn state(rows: Vec<PlayerRow>, teams: usize) -> DraftState {
        DraftState::new(
            Arc::new(PlayerPool::from_rows(rows)),
            DraftSettings {
                format: ScoringFormat::Standard,
                team_count: teams,
                round_count: 10,
                order: DraftOrder::Snake,
            },
        )
        .unwrap()
    }

    fn template(names: &[&str]) -> RosterTemplate {
        RosterTemplate(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn replacement_index_counts_flex_for_rb_and_wr() {
        let t = RosterTemplate::default();
        // 2 WR starters * 12 + floor(0.5 * 2 * 12)
        assert_eq!(replacement_index(Position::WideReceiver, &t, 12), 36);
        assert_eq!(replacement_index(Position::RunningBack, &t, 12), 36);
        assert_eq!(replacement_index(Position::TightEnd, &t, 12), 12);
        assert_eq!(replacement_index(Position::Quarterback, &t, 12), 12);
    }

    #[test]
    fn replacement_index_floors_odd_flex_share() {
        let t = template(&["WR1", "FLEX1"]);
        assert_eq!(replacement_index(Position::WideReceiver, &t, 3), 3 + 1);
    }

    #[test]
    fn five_receivers_with_baseline_at_index_three() {
        // One WR slot, three teams: replacement index 3.
        let mut s = state(
            vec![
                row("Wr A", Position::WideReceiver, 200.0),
                row("Wr B", Position::WideReceiver, 180.0),
                row("Wr C", Position::WideReceiver, 150.0),
                row("Wr D", Position::WideReceiver, 140.0),
                row("Wr E", Position::WideReceiver, 100.0),
            ],
            3,
        );
        let t = template(&["WR1"]);
        assert_eq!(replacement_index(Position::WideReceiver, &t, 3), 3);
        compute_vorp(&mut s, Position::WideReceiver, &t, 3, 1.0).unwrap();

        let vorps: Vec<f64> = (0..5).map(|i| s.vorp(PlayerId(i))).collect();
        assert_eq!(vorps, vec![60.0, 40.0, 10.0, 0.0, -40.0]);
    }

    #[test]
    fn shallow_position_uses_zero_baseline() {
        let mut s = state(vec![row("Te A", Position::TightEnd, 120.0)], 12);
        compute_vorp(&mut s, Position::TightEnd, &RosterTemplate::default(), 12, 1.0).unwrap();
        assert_eq!(s.vorp(PlayerId(0)), 120.0);
    }

    #[test]
    fn other_positions_untouched() {
        let mut s = state(
            vec![
                row("Qb A", Position::Quarterback, 300.0),
                row("Wr A", Position::WideReceiver, 200.0),
            ],
            1,
        );
        let t = template(&["QB1", "WR1"]);
        compute_vorp(&mut s, Position::WideReceiver, &t, 1, 1.0).unwrap();
        assert_eq!(s.vorp(PlayerId(0)), 0.0);
        assert_eq!(s.vorp(PlayerId(1)), 200.0);
    }

    #[test]
    fn refresh_discounts_quarterbacks_and_skips_kickers() {
        let mut s = state(
            vec![
                row("Qb A", Position::Quarterback, 300.0),
                row("Qb B", Position::Quarterback, 250.0),
                row("K A", Position::Kicker, 150.0),
            ],
            1,
        );
        let engine = ValuationEngine::new(template(&["QB1", "K"]), 1);
        engine.refresh(&mut s).unwrap();
        assert_eq!(s.vorp(PlayerId(0)), 40.0);
        assert_eq!(s.vorp(PlayerId(1)), 0.0);
        assert_eq!(s.vorp(PlayerId(2)), 0.0);
    }

    #[test]
    fn refresh_tracks_the_shrinking_pool() {
        let mut s = state(
            vec![
                row("Wr A", Position::WideReceiver, 200.0),
                row("Wr B", Position::WideReceiver, 180.0),
                row("Wr C", Position::WideReceiver, 150.0),
            ],
            1,
        );
        let engine = ValuationEngine::new(template(&["WR1"]), 1);
        engine.refresh(&mut s).unwrap();
        assert_eq!(s.vorp(PlayerId(1)), 0.0);

        s.draft_player("Wr A").unwrap();
        engine.refresh(&mut s).unwrap();
        assert_eq!(s.vorp(PlayerId(1)), 30.0);
        assert_eq!(s.vorp(PlayerId(2)), 0.0);
    }
}
