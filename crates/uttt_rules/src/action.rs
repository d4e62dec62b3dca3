//! First-class move types.
//!
//! A [`Placement`] is intent: a mark aimed at one cell. A [`Move`] is a
//! placement that a history accepted, stamped with its sequence number and
//! time. Moves are never edited after they are recorded.

use super::state::Outcome;
use super::types::{Mark, Slot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A mark aimed at one cell of one sub-board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Target sub-board.
    pub sub_board: Slot,
    /// Target cell within the sub-board.
    pub cell: Slot,
    /// Mark being placed.
    pub mark: Mark,
}

impl Placement {
    /// Creates a new placement.
    pub fn new(sub_board: Slot, cell: Slot, mark: Mark) -> Self {
        Self {
            sub_board,
            cell,
            mark,
        }
    }

    /// Creates a placement from raw indices.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::OutOfRange`] if either index is outside 0-8.
    #[instrument]
    pub fn from_indices(sub_board: i64, cell: i64, mark: Mark) -> Result<Self, MoveError> {
        match (Slot::try_from(sub_board), Slot::try_from(cell)) {
            (Ok(sub_board), Ok(cell)) => Ok(Self::new(sub_board, cell, mark)),
            _ => Err(MoveError::OutOfRange { sub_board, cell }),
        }
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} B{}C{}",
            self.mark,
            self.sub_board.get() + 1,
            self.cell.get() + 1
        )
    }
}

/// A recorded move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    sub_board: Slot,
    cell: Slot,
    mark: Mark,
    sequence: usize,
    timestamp: DateTime<Utc>,
}

impl Move {
    /// Records a placement at the given sequence number, stamped now.
    pub fn record(placement: Placement, sequence: usize) -> Self {
        Self::with_timestamp(placement, sequence, Utc::now())
    }

    /// Rebuilds a move with a known timestamp (e.g. loaded from storage).
    pub fn with_timestamp(placement: Placement, sequence: usize, timestamp: DateTime<Utc>) -> Self {
        Self {
            sub_board: placement.sub_board,
            cell: placement.cell,
            mark: placement.mark,
            sequence,
            timestamp,
        }
    }

    /// The placement this move recorded.
    pub fn placement(&self) -> Placement {
        Placement::new(self.sub_board, self.cell, self.mark)
    }

    /// Target sub-board.
    pub fn sub_board(&self) -> Slot {
        self.sub_board
    }

    /// Target cell.
    pub fn cell(&self) -> Slot {
        self.cell
    }

    /// Mark placed.
    pub fn mark(&self) -> Mark {
        self.mark
    }

    /// Zero-based position in the history.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// When the move was recorded.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.sequence + 1, self.placement())
    }
}

/// Error that can occur when validating or applying a placement.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveError {
    /// Sub-board or cell index outside 0-8.
    #[display("Position B{}C{} is out of range (indices must be 0-8)", sub_board, cell)]
    OutOfRange {
        /// Requested sub-board index.
        sub_board: i64,
        /// Requested cell index.
        cell: i64,
    },

    /// The match is already decided.
    #[display("Game is already over: {}", _0)]
    GameOver(Outcome),

    /// It's the other side's turn.
    #[display("It's {}'s turn, not {}'s", expected, actual)]
    WrongMark {
        /// Mark to move.
        expected: Mark,
        /// Mark that tried to move.
        actual: Mark,
    },

    /// The placement ignores the active constraint.
    #[display("Must play in sub-board {}, not {}", expected, actual)]
    WrongSubBoard {
        /// Sub-board the mover is constrained to.
        expected: Slot,
        /// Sub-board that was targeted.
        actual: Slot,
    },

    /// The target sub-board is already won or drawn.
    #[display("Sub-board {} is already decided", _0)]
    ClosedSubBoard(Slot),

    /// The target cell is occupied.
    #[display("Cell {} of sub-board {} is already occupied", cell, sub_board)]
    CellOccupied {
        /// Target sub-board.
        sub_board: Slot,
        /// Target cell.
        cell: Slot,
    },

    /// A transition invariant failed (postcondition failure).
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl std::error::Error for MoveError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_indices_rejects_out_of_range() {
        let err = Placement::from_indices(9, 0, Mark::Human).unwrap_err();
        assert_eq!(err, MoveError::OutOfRange { sub_board: 9, cell: 0 });

        let err = Placement::from_indices(0, -3, Mark::Human).unwrap_err();
        assert_eq!(err, MoveError::OutOfRange { sub_board: 0, cell: -3 });
    }

    #[test]
    fn placement_displays_one_based() {
        let placement = Placement::from_indices(0, 8, Mark::Opponent).unwrap();
        assert_eq!(placement.to_string(), "O B1C9");
    }

    #[test]
    fn recorded_move_keeps_placement() {
        let placement = Placement::from_indices(2, 5, Mark::Human).unwrap();
        let mv = Move::record(placement, 7);
        assert_eq!(mv.placement(), placement);
        assert_eq!(mv.sequence(), 7);
        assert_eq!(mv.to_string(), "8. X B3C6");
    }
}
