//! Nested board storage. Statuses are always derived from cells.

use super::lines::{BoardStatus, Symbol, evaluate_lines};
use super::types::{Cell, Mark, Slot};
use serde::{Deserialize, Serialize};

/// Marks of all 81 cells, indexed `[sub_board][cell]`.
pub type Grid = [[Option<Mark>; 9]; 9];

/// One of the nine inner 3x3 grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SubBoard {
    /// Cells in row-major order (0-8).
    cells: [Cell; 9],
}

impl SubBoard {
    /// Creates an empty sub-board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the cell at the given slot.
    pub fn cell(&self, slot: Slot) -> Cell {
        self.cells[slot.index()]
    }

    /// Returns all cells.
    pub fn cells(&self) -> &[Cell; 9] {
        &self.cells
    }

    /// Slots that are still empty.
    pub fn empty_cells(&self) -> impl Iterator<Item = Slot> + '_ {
        Slot::ALL
            .into_iter()
            .filter(|slot| self.cells[slot.index()].is_empty())
    }

    /// Evaluates this sub-board against the 8 lines.
    pub fn status(&self) -> BoardStatus {
        evaluate_lines(&self.cells.map(Symbol::from))
    }

    pub(crate) fn place(&mut self, slot: Slot, mark: Mark) {
        debug_assert!(self.cells[slot.index()].is_empty(), "cell overwritten");
        self.cells[slot.index()] = Cell::Marked(mark);
    }
}

/// The full 9x9 board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board {
    sub_boards: [SubBoard; 9],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from a grid of marks.
    ///
    /// Performs no legality checks; used to inspect arbitrary positions.
    pub fn from_grid(grid: &Grid) -> Self {
        let mut board = Self::new();
        for sub in Slot::ALL {
            for cell in Slot::ALL {
                if let Some(mark) = grid[sub.index()][cell.index()] {
                    board.place(sub, cell, mark);
                }
            }
        }
        board
    }

    /// Returns the sub-board at the given slot.
    pub fn sub_board(&self, slot: Slot) -> &SubBoard {
        &self.sub_boards[slot.index()]
    }

    /// Returns all sub-boards.
    pub fn sub_boards(&self) -> &[SubBoard; 9] {
        &self.sub_boards
    }

    /// Gets a single cell.
    pub fn cell(&self, sub_board: Slot, cell: Slot) -> Cell {
        self.sub_boards[sub_board.index()].cell(cell)
    }

    /// Status of each sub-board, forming the meta-board.
    pub fn sub_board_statuses(&self) -> [BoardStatus; 9] {
        self.sub_boards.map(|sub| sub.status())
    }

    /// Evaluates the meta-board with the same primitive as a sub-board.
    pub fn meta_status(&self) -> BoardStatus {
        evaluate_lines(&self.sub_board_statuses().map(Symbol::from))
    }

    /// Number of marked cells.
    pub fn count_marks(&self) -> usize {
        self.sub_boards
            .iter()
            .flat_map(|sub| sub.cells.iter())
            .filter(|cell| !cell.is_empty())
            .count()
    }

    /// Exports the marks as a grid.
    pub fn to_grid(&self) -> Grid {
        self.sub_boards.map(|sub| sub.cells.map(Cell::mark))
    }

    pub(crate) fn place(&mut self, sub_board: Slot, cell: Slot, mark: Mark) {
        self.sub_boards[sub_board.index()].place(cell, mark);
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for big_row in 0..3 {
            if big_row > 0 {
                writeln!(f, "------+-------+------")?;
            }
            for inner_row in 0..3 {
                let mut line = String::new();
                for big_col in 0..3 {
                    if big_col > 0 {
                        line.push_str("| ");
                    }
                    let sub = &self.sub_boards[big_row * 3 + big_col];
                    for inner_col in 0..3 {
                        let symbol = match sub.cells[inner_row * 3 + inner_col] {
                            Cell::Empty => '.',
                            Cell::Marked(Mark::Human) => 'X',
                            Cell::Marked(Mark::Opponent) => 'O',
                        };
                        line.push(symbol);
                        line.push(' ');
                    }
                }
                writeln!(f, "{}", line.trim_end())?;
            }
        }
        Ok(())
    }
}
