//! Position evaluation: legality, outcome and the active constraint.

use super::action::{MoveError, Placement};
use super::board::Board;
#[cfg(debug_assertions)]
use super::invariants::{InvariantSet, Transition, TransitionInvariants};
use super::lines::BoardStatus;
use super::types::{Mark, Slot};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Overall status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Moves are still accepted.
    InProgress,
    /// A meta-board line was completed.
    Won(Mark),
    /// Every sub-board is decided and no meta line exists.
    Drawn,
}

impl MatchStatus {
    /// Checks if the match still accepts moves.
    pub fn is_in_progress(self) -> bool {
        matches!(self, MatchStatus::InProgress)
    }

    /// Returns the final outcome, if decided.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            MatchStatus::InProgress => None,
            MatchStatus::Won(mark) => Some(Outcome::Winner(mark)),
            MatchStatus::Drawn => Some(Outcome::Draw),
        }
    }
}

impl From<BoardStatus> for MatchStatus {
    fn from(status: BoardStatus) -> Self {
        match status {
            BoardStatus::Open => MatchStatus::InProgress,
            BoardStatus::Won(mark) => MatchStatus::Won(mark),
            BoardStatus::Drawn => MatchStatus::Drawn,
        }
    }
}

/// Outcome of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// This side won.
    Winner(Mark),
    /// Nobody won.
    Draw,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(mark) => write!(f, "Player {} wins", mark),
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}

/// Where the next mover may play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    /// Any open sub-board.
    Unconstrained,
    /// Only this sub-board.
    Constrained(Slot),
}

impl Constraint {
    /// Checks if the constraint permits the given sub-board.
    pub fn allows(self, sub_board: Slot) -> bool {
        match self {
            Constraint::Unconstrained => true,
            Constraint::Constrained(slot) => slot == sub_board,
        }
    }
}

/// A position reached by replaying placements from the empty board.
///
/// Always a projection: cheap to rebuild, never a source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchState {
    board: Board,
    constraint: Constraint,
    next_mark: Mark,
    status: MatchStatus,
    moves_played: usize,
    last_move: Option<Placement>,
}

impl MatchState {
    /// The empty starting position. Human moves first, anywhere.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            constraint: Constraint::Unconstrained,
            next_mark: Mark::Human,
            status: MatchStatus::InProgress,
            moves_played: 0,
            last_move: None,
        }
    }

    /// Replays placements from the empty board.
    ///
    /// # Errors
    ///
    /// Returns the first [`MoveError`] hit while replaying.
    #[instrument(skip(placements))]
    pub fn replay<I>(placements: I) -> Result<Self, MoveError>
    where
        I: IntoIterator<Item = Placement>,
    {
        placements
            .into_iter()
            .try_fold(Self::new(), |state, placement| state.apply(placement))
    }

    /// Validates a placement against this position.
    ///
    /// # Errors
    ///
    /// Returns the first rule the placement breaks.
    pub fn check(&self, placement: &Placement) -> Result<(), MoveError> {
        if let Some(outcome) = self.status.outcome() {
            return Err(MoveError::GameOver(outcome));
        }

        if placement.mark != self.next_mark {
            return Err(MoveError::WrongMark {
                expected: self.next_mark,
                actual: placement.mark,
            });
        }

        if let Constraint::Constrained(expected) = self.constraint {
            if expected != placement.sub_board {
                return Err(MoveError::WrongSubBoard {
                    expected,
                    actual: placement.sub_board,
                });
            }
        }

        let sub = self.board.sub_board(placement.sub_board);
        if !sub.status().is_open() {
            return Err(MoveError::ClosedSubBoard(placement.sub_board));
        }

        if !sub.cell(placement.cell).is_empty() {
            return Err(MoveError::CellOccupied {
                sub_board: placement.sub_board,
                cell: placement.cell,
            });
        }

        Ok(())
    }

    /// Checks if a placement is legal here.
    pub fn is_legal(&self, placement: &Placement) -> bool {
        self.check(placement).is_ok()
    }

    /// Returns the position after the placement.
    ///
    /// Contract enforcement:
    /// - Preconditions checked always ([`MatchState::check`])
    /// - Transition invariants checked in debug builds only
    ///
    /// # Errors
    ///
    /// Returns [`MoveError`] if the placement is illegal.
    #[instrument(skip(self), fields(moves_played = self.moves_played))]
    pub fn apply(&self, placement: Placement) -> Result<Self, MoveError> {
        self.check(&placement)?;

        let mut next = self.clone();
        next.board.place(placement.sub_board, placement.cell, placement.mark);

        let target = next.board.sub_board(placement.cell).status();
        next.constraint = if target.is_open() {
            Constraint::Constrained(placement.cell)
        } else {
            Constraint::Unconstrained
        };
        next.status = MatchStatus::from(next.board.meta_status());
        next.next_mark = placement.mark.opponent();
        next.moves_played += 1;
        next.last_move = Some(placement);

        #[cfg(debug_assertions)]
        TransitionInvariants::check_all(&Transition::new(self, &next)).map_err(|violations| {
            let descriptions = violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            MoveError::InvariantViolation(format!("Postcondition failed: {}", descriptions))
        })?;

        debug!(
            %placement,
            status = ?next.status,
            constraint = ?next.constraint,
            "Placement applied"
        );
        Ok(next)
    }

    /// Returns the outcome once the match is decided.
    pub fn winner(&self) -> Option<Outcome> {
        self.status.outcome()
    }

    /// All legal placements for the side to move.
    pub fn legal_moves(&self) -> Vec<Placement> {
        if !self.status.is_in_progress() {
            return Vec::new();
        }

        Slot::ALL
            .into_iter()
            .filter(|sub| self.constraint.allows(*sub))
            .map(|sub| (sub, self.board.sub_board(sub)))
            .filter(|(_, board)| board.status().is_open())
            .flat_map(|(sub, board)| {
                board
                    .empty_cells()
                    .map(move |cell| Placement::new(sub, cell, self.next_mark))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Sub-board the next mover is restricted to.
    pub fn active_constraint(&self) -> Constraint {
        self.constraint
    }

    /// Mark to move next.
    pub fn next_mark(&self) -> Mark {
        self.next_mark
    }

    /// Returns the match status.
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Number of placements applied since the empty board.
    pub fn moves_played(&self) -> usize {
        self.moves_played
    }

    /// The most recent placement, if any.
    pub fn last_move(&self) -> Option<Placement> {
        self.last_move
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}
