//! The line-evaluation primitive shared by sub-boards and the meta-board.
//!
//! A sub-board is nine cells; the meta-board is nine sub-board statuses.
//! Both are lowered to nine [`Symbol`]s and decided by [`evaluate_lines`],
//! so the two levels can never disagree about what a line is.

use super::types::{Cell, Mark};
use serde::{Deserialize, Serialize};

/// Winning combinations on a 3x3 grid (row-major indices).
pub const LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// One position of a 3x3 grid as seen by the line check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Still playable: an empty cell or an open sub-board.
    Vacant,
    /// Counts toward a line for this mark.
    Mark(Mark),
    /// Filled but owned by nobody: a drawn sub-board.
    Dead,
}

impl From<Cell> for Symbol {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => Symbol::Vacant,
            Cell::Marked(mark) => Symbol::Mark(mark),
        }
    }
}

impl From<BoardStatus> for Symbol {
    fn from(status: BoardStatus) -> Self {
        match status {
            BoardStatus::Open => Symbol::Vacant,
            BoardStatus::Won(mark) => Symbol::Mark(mark),
            BoardStatus::Drawn => Symbol::Dead,
        }
    }
}

/// Result of evaluating a 3x3 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardStatus {
    /// No line yet and at least one vacant position.
    Open,
    /// Three in a row for this mark.
    Won(Mark),
    /// No vacant position left and no line.
    Drawn,
}

impl BoardStatus {
    /// Checks if the grid can still be played.
    pub fn is_open(self) -> bool {
        matches!(self, BoardStatus::Open)
    }

    /// Returns the winning mark, if any.
    pub fn winner(self) -> Option<Mark> {
        match self {
            BoardStatus::Won(mark) => Some(mark),
            BoardStatus::Open | BoardStatus::Drawn => None,
        }
    }
}

/// Decides a 3x3 grid of symbols against the 8 standard lines.
pub fn evaluate_lines(symbols: &[Symbol; 9]) -> BoardStatus {
    for [a, b, c] in LINES {
        if let Symbol::Mark(mark) = symbols[a] {
            if symbols[b] == Symbol::Mark(mark) && symbols[c] == Symbol::Mark(mark) {
                return BoardStatus::Won(mark);
            }
        }
    }

    if symbols.contains(&Symbol::Vacant) {
        BoardStatus::Open
    } else {
        BoardStatus::Drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V: Symbol = Symbol::Vacant;
    const D: Symbol = Symbol::Dead;
    const X: Symbol = Symbol::Mark(Mark::Human);
    const O: Symbol = Symbol::Mark(Mark::Opponent);

    #[test]
    fn empty_grid_is_open() {
        assert_eq!(evaluate_lines(&[V; 9]), BoardStatus::Open);
    }

    #[test]
    fn every_line_wins() {
        for line in LINES {
            let mut symbols = [V; 9];
            for i in line {
                symbols[i] = O;
            }
            assert_eq!(evaluate_lines(&symbols), BoardStatus::Won(Mark::Opponent));
        }
    }

    #[test]
    fn full_grid_without_line_is_drawn() {
        let symbols = [X, O, X, X, O, O, O, X, X];
        assert_eq!(evaluate_lines(&symbols), BoardStatus::Drawn);
    }

    #[test]
    fn full_grid_with_diagonal_is_won() {
        // X O X / O X O / O X X holds the 0-4-8 diagonal.
        let symbols = [X, O, X, O, X, O, O, X, X];
        assert_eq!(evaluate_lines(&symbols), BoardStatus::Won(Mark::Human));
    }

    #[test]
    fn dead_symbols_never_form_a_line() {
        let symbols = [D, D, D, V, V, V, V, V, V];
        assert_eq!(evaluate_lines(&symbols), BoardStatus::Open);
        assert_eq!(evaluate_lines(&[D; 9]), BoardStatus::Drawn);
    }

    #[test]
    fn dead_symbol_breaks_a_line() {
        let symbols = [X, D, X, O, O, X, X, O, O];
        assert_eq!(evaluate_lines(&symbols), BoardStatus::Drawn);
    }
}
