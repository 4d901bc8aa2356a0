//! Player intents and the input mode state machine.
//!
//! The input collaborator turns raw keys into [`Intent`]s. The current
//! [`InputMode`] decides what each intent means:
//!
//! | Mode          | Intent          | Next mode         | Action |
//! |---------------|-----------------|-------------------|--------|
//! | PlayerControl | Move(dir)       | PlayerControl     | Step   |
//! | PlayerControl | Rest            | PlayerControl     | Rest   |
//! | PlayerControl | BeginTargeting  | ChooseTarget(pos) | none   |
//! | PlayerControl | Cancel/Confirm  | PlayerControl     | none   |
//! | ChooseTarget  | Move(dir)       | ChooseTarget(+d)  | none   |
//! | ChooseTarget  | Rest/Begin      | unchanged         | none   |
//! | ChooseTarget  | CancelTargeting | PlayerControl     | none   |
//! | ChooseTarget  | ConfirmTarget   | PlayerControl     | Fire if targetable |

use crate::components::Position;
use crate::line::trace_line;
use serde::{Deserialize, Serialize};

/// Eight-way compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::S,
        Direction::E,
        Direction::W,
        Direction::NE,
        Direction::NW,
        Direction::SE,
        Direction::SW,
    ];

    /// Tile offset; y grows downward.
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::N => (0, -1),
            Direction::S => (0, 1),
            Direction::E => (1, 0),
            Direction::W => (-1, 0),
            Direction::NE => (1, -1),
            Direction::NW => (-1, -1),
            Direction::SE => (1, 1),
            Direction::SW => (-1, 1),
        }
    }

    pub fn step(&self, from: &Position) -> Position {
        let (dx, dy) = self.delta();
        from.offset(dx, dy)
    }
}

/// High-level command from the input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Move(Direction),
    Rest,
    BeginTargeting,
    CancelTargeting,
    ConfirmTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputMode {
    /// Direction keys move the player.
    #[default]
    PlayerControl,
    /// Direction keys move a targeting cursor.
    ChooseTarget { target: Position },
}

/// What the simulation must do after an intent is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// Queue a player step onto `target`, then run a player and an NPC pass.
    Step { target: Position },
    /// Let time pass for one pass.
    Rest,
    /// Fire a projectile at `target`, then run a player and an NPC pass.
    Fire { target: Position },
}

impl InputMode {
    /// Apply `intent` given the player's position and a targetability check.
    pub fn handle(
        self,
        intent: Intent,
        player: Position,
        targetable: impl Fn(&Position) -> bool,
    ) -> (InputMode, Action) {
        match (self, intent) {
            (InputMode::PlayerControl, Intent::Move(dir)) => (
                self,
                Action::Step {
                    target: dir.step(&player),
                },
            ),
            (InputMode::PlayerControl, Intent::Rest) => (self, Action::Rest),
            (InputMode::PlayerControl, Intent::BeginTargeting) => {
                (InputMode::ChooseTarget { target: player }, Action::None)
            }
            (InputMode::PlayerControl, _) => (self, Action::None),

            (InputMode::ChooseTarget { target }, Intent::Move(dir)) => (
                InputMode::ChooseTarget {
                    target: dir.step(&target),
                },
                Action::None,
            ),
            (InputMode::ChooseTarget { .. }, Intent::CancelTargeting) => {
                (InputMode::PlayerControl, Action::None)
            }
            (InputMode::ChooseTarget { target }, Intent::ConfirmTarget) => {
                let action = if targetable(&target) {
                    Action::Fire { target }
                } else {
                    Action::None
                };
                (InputMode::PlayerControl, action)
            }
            (InputMode::ChooseTarget { .. }, _) => (self, Action::None),
        }
    }
}

/// Cursor state shown while choosing a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingPreview {
    pub cursor: Position,
    /// Cells on the sight line, excluding the player's own tile.
    pub path: Vec<Position>,
    pub valid: bool,
}

/// Sight line from `from` to `to` on the occupant layer.
pub fn sight_line(from: &Position, to: &Position) -> Vec<Position> {
    trace_line((from.x, from.y), (to.x, to.y))
        .into_iter()
        .map(|(x, y)| Position::tile(x, y))
        .collect()
}

/// Whether a shot from `from` can be aimed at `to`.
///
/// The target must differ from the shooter's tile and nothing may fill the
/// sight line before its last cell.
pub fn is_targetable(from: &Position, to: &Position, filled: impl Fn(&Position) -> bool) -> bool {
    if from.x == to.x && from.y == to.y {
        return false;
    }
    let line = sight_line(from, to);
    let last = line.len().saturating_sub(1);
    line.iter()
        .enumerate()
        .all(|(i, cell)| i == last || !filled(cell))
}
