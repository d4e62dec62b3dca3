//! First-class invariants for state transitions.
//!
//! Invariants are logical properties that must hold across every move.
//! They are testable independently and checked after each
//! [`MatchState::apply`] in debug builds.

use super::state::MatchState;
use super::types::Slot;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let violations: Vec<_> = [
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
            (I3::holds(state), I3::description()),
        ]
        .into_iter()
        .filter(|(holds, _)| !holds)
        .map(|(_, description)| InvariantViolation::new(description))
        .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// A single move: the position before and after it.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    /// Position before the move.
    pub before: &'a MatchState,
    /// Position after the move.
    pub after: &'a MatchState,
}

impl<'a> Transition<'a> {
    /// Creates a transition.
    pub fn new(before: &'a MatchState, after: &'a MatchState) -> Self {
        Self { before, after }
    }
}

/// Invariant: filled cells never change.
pub struct MonotonicCells;

impl Invariant<Transition<'_>> for MonotonicCells {
    fn holds(t: &Transition<'_>) -> bool {
        Slot::ALL.into_iter().all(|sub| {
            Slot::ALL.into_iter().all(|cell| {
                let before = t.before.board().cell(sub, cell);
                before.is_empty() || before == t.after.board().cell(sub, cell)
            })
        })
    }

    fn description() -> &'static str {
        "Filled cells are monotonic (never overwritten)"
    }
}

/// Invariant: a decided sub-board keeps its status.
pub struct SettledSubBoards;

impl Invariant<Transition<'_>> for SettledSubBoards {
    fn holds(t: &Transition<'_>) -> bool {
        let before = t.before.board().sub_board_statuses();
        let after = t.after.board().sub_board_statuses();
        before
            .iter()
            .zip(after.iter())
            .all(|(b, a)| b.is_open() || b == a)
    }

    fn description() -> &'static str {
        "Decided sub-boards never reopen or change winner"
    }
}

/// Invariant: the side to move flips on every move.
pub struct AlternatingMarks;

impl Invariant<Transition<'_>> for AlternatingMarks {
    fn holds(t: &Transition<'_>) -> bool {
        t.after.next_mark() == t.before.next_mark().opponent()
            && t.after.moves_played() == t.before.moves_played() + 1
    }

    fn description() -> &'static str {
        "Marks alternate and the move count advances by one"
    }
}

/// All transition invariants checked after a move.
pub type TransitionInvariants = (MonotonicCells, SettledSubBoards, AlternatingMarks);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mark, Placement};

    fn first_move() -> (MatchState, MatchState) {
        let before = MatchState::new();
        let placement = Placement::from_indices(4, 4, Mark::Human).unwrap();
        let after = before.apply(placement).unwrap();
        (before, after)
    }

    #[test]
    fn legal_move_satisfies_all() {
        let (before, after) = first_move();
        assert!(TransitionInvariants::check_all(&Transition::new(&before, &after)).is_ok());
    }

    #[test]
    fn reversed_move_erases_a_cell() {
        let (before, after) = first_move();
        let reversed = Transition::new(&after, &before);

        assert!(!MonotonicCells::holds(&reversed));
        let violations = TransitionInvariants::check_all(&reversed).unwrap_err();
        // Undoing also rewinds the move counter.
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].description, MonotonicCells::description());
    }

    #[test]
    fn standing_still_breaks_alternation() {
        let (_, after) = first_move();
        assert!(!AlternatingMarks::holds(&Transition::new(&after, &after)));
        assert!(MonotonicCells::holds(&Transition::new(&after, &after)));
    }
}
