//! Ultimate Tic-Tac-Toe rules - pure, synchronous, no I/O.
//!
//! Nine tic-tac-toe sub-boards arranged in a 3x3 meta-board. The cell a
//! player marks decides which sub-board the other player must answer in.
//!
//! # Architecture
//!
//! - **Lines**: one `evaluate_lines` primitive decides a 3x3 grid of symbols
//! - **Board**: cells and sub-boards; statuses are derived, never stored
//! - **MatchState**: legality, outcome and the active constraint for a position
//! - **Invariants**: transition properties checked after every move in debug builds
//!
//! # Example
//!
//! ```
//! use uttt_rules::{Constraint, MatchState, Mark, Placement, Slot};
//!
//! # fn example() -> Result<(), uttt_rules::MoveError> {
//! let state = MatchState::new();
//! let state = state.apply(Placement::from_indices(4, 0, Mark::Human)?)?;
//! assert_eq!(state.active_constraint(), Constraint::Constrained(Slot::TOP_LEFT));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod board;
mod invariants;
mod lines;
mod state;
mod types;

pub use action::{Move, MoveError, Placement};
pub use board::{Board, Grid, SubBoard};
pub use invariants::{
    AlternatingMarks, Invariant, InvariantSet, InvariantViolation, MonotonicCells,
    SettledSubBoards, Transition, TransitionInvariants,
};
pub use lines::{BoardStatus, LINES, Symbol, evaluate_lines};
pub use state::{Constraint, MatchState, MatchStatus, Outcome};
pub use types::{Cell, Mark, Slot, SlotOutOfRange};
