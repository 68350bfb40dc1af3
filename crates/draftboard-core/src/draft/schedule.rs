// Pick-order scheduling: which team is on the clock for a given pick number.
//
// Pick numbers are 1-based. Draft slots are 1-based. Team indices are
// 0-based, so the team drafting from slot `s` has index `s - 1`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How team order proceeds from one round to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftOrder {
    /// Every even round runs in reverse.
    Snake,
    /// Every round runs in the same order.
    Normal,
}

impl FromStr for DraftOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "snake" => Ok(DraftOrder::Snake),
            "normal" | "linear" => Ok(DraftOrder::Normal),
            other => Err(format!("unknown draft order '{}'", other)),
        }
    }
}

impl fmt::Display for DraftOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftOrder::Snake => write!(f, "snake"),
            DraftOrder::Normal => write!(f, "normal"),
        }
    }
}

/// 1-based round of `pick`.
pub fn round_of(pick: u32, team_count: usize) -> u32 {
    let teams = team_count.max(1) as u32;
    (pick.max(1) - 1) / teams + 1
}

/// Team index on the clock for `pick` by the arithmetic rule.
pub fn team_on_clock(pick: u32, order: DraftOrder, team_count: usize) -> usize {
    let teams = team_count.max(1) as u32;
    let round = round_of(pick, team_count);
    let within = (pick.max(1) - 1) % teams;
    let index = match order {
        DraftOrder::Snake if round % 2 == 0 => teams - 1 - within,
        _ => within,
    };
    index as usize
}

/// Pick numbers owned by draft slot `pick_slot` (1-based) over the draft.
pub fn user_picks(pick_slot: u32, order: DraftOrder, team_count: usize, round_count: u32) -> Vec<u32> {
    let teams = team_count as u32;
    (1..=round_count)
        .map(|round| {
            let base = (round - 1) * teams;
            match order {
                DraftOrder::Snake if round % 2 == 0 => base + (teams - pick_slot + 1),
                _ => base + pick_slot,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Precomputed order table
// ---------------------------------------------------------------------------

/// Draft slot for every pick, round by round, as a live platform reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickOrderTable {
    rounds: Vec<Vec<u32>>,
}

impl PickOrderTable {
    /// Build the table from the arithmetic rule.
    pub fn build(order: DraftOrder, team_count: usize, round_count: u32) -> Self {
        let slots: Vec<u32> = (1..=team_count as u32).collect();
        let rounds = (1..=round_count)
            .map(|round| {
                if order == DraftOrder::Snake && round % 2 == 0 {
                    slots.iter().rev().copied().collect()
                } else {
                    slots.clone()
                }
            })
            .collect();
        PickOrderTable { rounds }
    }

    /// Wrap a table supplied by a live platform.
    pub fn from_rounds(rounds: Vec<Vec<u32>>) -> Self {
        PickOrderTable { rounds }
    }

    /// Draft slot on the clock at `pick`, if the table covers it.
    pub fn slot_for(&self, pick: u32) -> Option<u32> {
        if pick == 0 {
            return None;
        }
        let mut remaining = (pick - 1) as usize;
        for round in &self.rounds {
            if remaining < round.len() {
                return Some(round[remaining]);
            }
            remaining -= round.len();
        }
        None
    }

    pub fn total_picks(&self) -> u32 {
        self.rounds.iter().map(|r| r.len() as u32).sum()
    }
}

// ---------------------------------------------------------------------------
// PickSchedule
// ---------------------------------------------------------------------------

/// Turn order for one draft. A precomputed table, when present, is
/// authoritative; the arithmetic rule covers everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickSchedule {
    pub order: DraftOrder,
    pub team_count: usize,
    pub round_count: u32,
    table: Option<PickOrderTable>,
}

impl PickSchedule {
    pub fn new(order: DraftOrder, team_count: usize, round_count: u32) -> Self {
        PickSchedule {
            order,
            team_count,
            round_count,
            table: None,
        }
    }

    pub fn with_table(mut self, table: PickOrderTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn table(&self) -> Option<&PickOrderTable> {
        self.table.as_ref()
    }

    pub fn total_picks(&self) -> u32 {
        u32::try_from(self.team_count)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.round_count)
    }

    /// Team index on the clock at `pick`, or `None` past the last pick.
    pub fn team_on_clock(&self, pick: u32) -> Option<usize> {
        if pick == 0 || pick > self.total_picks() {
            return None;
        }
        if let Some(slot) = self.table.as_ref().and_then(|t| t.slot_for(pick)) {
            if slot >= 1 && (slot as usize) <= self.team_count {
                return Some(slot as usize - 1);
            }
        }
        Some(team_on_clock(pick, self.order, self.team_count))
    }

    /// Every pick number owned by `team`, ascending.
    pub fn picks_for_team(&self, team: usize) -> Vec<u32> {
        (1..=self.total_picks())
            .filter(|&pick| self.team_on_clock(pick) == Some(team))
            .collect()
    }

    /// First pick owned by `team` strictly after `pick`.
    pub fn next_pick_for_team(&self, team: usize, pick: u32) -> Option<u32> {
        (pick.checked_add(1)?..=self.total_picks()).find(|&p| self.team_on_clock(p) == Some(team))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
