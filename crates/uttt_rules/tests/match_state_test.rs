//! Tests for nested legality and win/draw detection.

use uttt_rules::{
    Board, BoardStatus, Constraint, Grid, Mark, MatchState, MatchStatus, MoveError, Outcome,
    Placement, Slot,
};

fn place(sub: i64, cell: i64, mark: Mark) -> Placement {
    Placement::from_indices(sub, cell, mark).expect("valid indices")
}

fn slot(i: u8) -> Slot {
    Slot::new(i).expect("valid slot")
}

/// Opponent collects the top row of sub-board 0 while the human keeps
/// sending it back there.
fn opponent_wins_sub_board_zero() -> Vec<Placement> {
    vec![
        place(4, 0, Mark::Human),
        place(0, 1, Mark::Opponent),
        place(1, 0, Mark::Human),
        place(0, 2, Mark::Opponent),
        place(2, 0, Mark::Human),
        place(0, 0, Mark::Opponent),
    ]
}

#[test]
fn test_constraint_follows_cell() {
    let state = MatchState::replay([place(0, 0, Mark::Human), place(0, 1, Mark::Opponent)])
        .expect("Valid replay");

    assert_eq!(state.active_constraint(), Constraint::Constrained(slot(1)));

    let result = state.apply(place(2, 0, Mark::Human));
    assert_eq!(
        result,
        Err(MoveError::WrongSubBoard {
            expected: slot(1),
            actual: slot(2)
        })
    );
}

#[test]
fn test_illegal_after_three_moves() {
    let state = MatchState::replay([
        place(0, 0, Mark::Human),
        place(0, 1, Mark::Opponent),
        place(1, 4, Mark::Human),
    ])
    .expect("Valid replay");

    assert_eq!(state.active_constraint(), Constraint::Constrained(slot(4)));
    assert!(!state.is_legal(&place(2, 0, Mark::Human)));
    assert!(state.apply(place(2, 0, Mark::Human)).is_err());
}

#[test]
fn test_won_sub_board_frees_next_mover() {
    let state = MatchState::replay(opponent_wins_sub_board_zero()).expect("Valid replay");

    assert_eq!(
        state.board().sub_board(slot(0)).status(),
        BoardStatus::Won(Mark::Opponent)
    );
    assert_eq!(state.active_constraint(), Constraint::Unconstrained);
    assert_eq!(state.status(), MatchStatus::InProgress);

    let result = state.apply(place(0, 3, Mark::Human));
    assert_eq!(result, Err(MoveError::ClosedSubBoard(slot(0))));

    assert!(state.legal_moves().iter().all(|p| p.sub_board != slot(0)));
    assert!(state.apply(place(5, 5, Mark::Human)).is_ok());
}

#[test]
fn test_meta_line_wins_despite_drawn_sub_board() {
    let x = Some(Mark::Human);
    let o = Some(Mark::Opponent);
    let won_by_x = [x, x, x, None, None, None, None, None, None];
    let drawn = [x, o, x, x, o, o, o, x, x];

    let mut grid: Grid = [won_by_x; 9];
    grid[3] = drawn;
    let board = Board::from_grid(&grid);

    assert_eq!(board.sub_board(slot(3)).status(), BoardStatus::Drawn);
    assert_eq!(board.meta_status(), BoardStatus::Won(Mark::Human));
    assert_eq!(
        MatchStatus::from(board.meta_status()).outcome(),
        Some(Outcome::Winner(Mark::Human))
    );
}

#[test]
fn test_all_decided_without_meta_line_is_drawn() {
    let x = Some(Mark::Human);
    let o = Some(Mark::Opponent);
    let won_by_x = [x, x, x, None, None, None, None, None, None];
    let won_by_o = [o, o, o, None, None, None, None, None, None];
    let drawn = [x, o, x, x, o, o, o, x, x];

    // Meta-board:  X O X / X O O / O X D  has no line.
    let grid: Grid = [
        won_by_x, won_by_o, won_by_x, won_by_x, won_by_o, won_by_o, won_by_o, won_by_x, drawn,
    ];
    let board = Board::from_grid(&grid);

    assert_eq!(board.meta_status(), BoardStatus::Drawn);
}

#[test]
fn test_drawn_sub_board_is_not_won() {
    let x = Some(Mark::Human);
    let o = Some(Mark::Opponent);
    let mut grid: Grid = [[None; 9]; 9];
    grid[4] = [x, o, x, x, o, o, o, x, x];

    let board = Board::from_grid(&grid);
    assert_eq!(board.sub_board(slot(4)).status(), BoardStatus::Drawn);
    assert_eq!(board.meta_status(), BoardStatus::Open);
}

#[test]
fn test_moves_after_game_over_rejected() {
    // First-legal playout until the match is decided.
    let mut state = MatchState::new();
    while let Some(placement) = state.legal_moves().first().copied() {
        state = state.apply(placement).expect("Legal move must apply");
    }

    let outcome = state.winner().expect("Playout must end decided");
    assert!(state.legal_moves().is_empty());

    let any = place(0, 0, state.next_mark());
    assert_eq!(state.apply(any), Err(MoveError::GameOver(outcome)));
}

#[test]
fn test_playout_keeps_derived_state_consistent() {
    let mut state = MatchState::new();
    let mut played = Vec::new();

    while let Some(placement) = state.legal_moves().first().copied() {
        state = state.apply(placement).expect("Legal move must apply");
        played.push(placement);

        // Constraint is recomputed from the target sub-board every time.
        let target = state.board().sub_board(placement.cell).status();
        match state.active_constraint() {
            Constraint::Constrained(sub) => {
                assert_eq!(sub, placement.cell);
                assert!(target.is_open());
            }
            Constraint::Unconstrained => assert!(!target.is_open()),
        }

        // Turn derives from the move count alone.
        assert_eq!(state.next_mark(), Mark::to_move_after(played.len()));
    }

    assert!(played.len() <= 81);
    assert_eq!(state.board().count_marks(), played.len());
    assert_eq!(MatchState::replay(played.iter().copied()), Ok(state));
}
