// Positional scarcity: how steeply VORP falls after the best player left at
// each skill position.

use crate::draft::state::DraftState;
use crate::player::{PlayerId, Position};

/// Drop-off from the best to the second-best available VORP at one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionDropoff {
    pub position: Position,
    /// Best available player at the position.
    pub top: PlayerId,
    /// Zero when only one player remains.
    pub dropoff: f64,
}

/// Drop-off for every skill position that still has an available player,
/// in QB/RB/WR/TE order.
pub fn position_dropoffs(state: &DraftState) -> Vec<PositionDropoff> {
    Position::SKILL
        .iter()
        .filter_map(|&position| {
            let mut vorps: Vec<(PlayerId, f64)> = state
                .available_players()
                .filter(|p| p.position == position)
                .map(|p| (p.id, state.vorp(p.id)))
                .collect();
            vorps.sort_by(|a, b| b.1.total_cmp(&a.1));

            let (top, top_vorp) = *vorps.first()?;
            let dropoff = vorps.get(1).map(|(_, v)| top_vorp - v).unwrap_or(0.0);
            Some(PositionDropoff {
                position,
                top,
                dropoff,
            })
        })
        .collect()
}

/// The best player at the position with the largest drop-off. The earliest
/// position wins ties.
pub fn scarcity_leader(state: &DraftState) -> Option<PlayerId> {
    let mut best: Option<PositionDropoff> = None;
    for d in position_dropoffs(state) {
        match best {
            Some(b) if d.dropoff <= b.dropoff => {}
            _ => best = Some(d),
        }
    }
    best.map(|d| d.top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::roster::RosterTemplate;
    use crate::draft::schedule::DraftOrder;
    use crate::draft::state::DraftSettings;
    use crate::player::{FormatValues, PlayerPool, PlayerRow, ScoringFormat};
    use crate::valuation::vorp::ValuationEngine;
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

    fn valued_state(rows: Vec<PlayerRow>) -> DraftState {
        let mut state = DraftState::new(
            Arc::new(PlayerPool::from_rows(rows)),
            DraftSettings {
                format: ScoringFormat::Standard,
                team_count: 1,
                round_count: 5,
                order: DraftOrder::Snake,
            },
        )
        .unwrap();
        ValuationEngine::new(RosterTemplate::default(), 1)
            .refresh(&mut state)
            .unwrap();
        state
    }

    #[test]
    fn leader_is_top_of_steepest_position() {
        let state = valued_state(vec![
            row("Rb A", Position::RunningBack, 250.0),
            row("Rb B", Position::RunningBack, 245.0),
            row("Te A", Position::TightEnd, 200.0),
            row("Te B", Position::TightEnd, 120.0),
        ]);
        assert_eq!(scarcity_leader(&state), Some(PlayerId(2)));
    }

    #[test]
    fn single_player_has_zero_dropoff() {
        let state = valued_state(vec![row("Qb A", Position::Quarterback, 300.0)]);
        let d = position_dropoffs(&state);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].dropoff, 0.0);
        assert_eq!(scarcity_leader(&state), Some(PlayerId(0)));
    }

    #[test]
    fn no_skill_players_means_no_leader() {
        let state = valued_state(vec![row("K A", Position::Kicker, 140.0)]);
        assert_eq!(scarcity_leader(&state), None);
    }
}
