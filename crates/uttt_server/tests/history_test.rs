//! Tests for history navigation, divergence and snapshots.

use uttt_rules::{Constraint, Mark, MatchState, Placement, Slot};
use uttt_server::{HistoryError, HistoryManager, SnapshotId, SnapshotPolicy};

/// Plays `n` moves, each the first legal placement.
fn played(policy: SnapshotPolicy, n: usize) -> HistoryManager {
    let mut history = HistoryManager::new(policy);
    for _ in 0..n {
        play_first(&mut history);
    }
    history
}

fn play_first(history: &mut HistoryManager) -> Placement {
    let placement = *history
        .current_state()
        .legal_moves()
        .first()
        .expect("Game should still be open");
    history.apply_move(placement).expect("Legal move must apply");
    placement
}

fn play_last(history: &mut HistoryManager) -> Placement {
    let placement = *history
        .current_state()
        .legal_moves()
        .last()
        .expect("Game should still be open");
    history.apply_move(placement).expect("Legal move must apply");
    placement
}

#[test]
fn test_goto_is_idempotent() {
    let mut history = played(SnapshotPolicy::default(), 7);

    let first = history.goto_move(4).expect("In range");
    let second = history.goto_move(4).expect("In range");

    assert_eq!(first, second);
    assert_eq!(history.cursor(), 4);
    assert_eq!(history.len(), 7);
    assert_eq!(history.current_state(), &first);
}

#[test]
fn test_goto_end_matches_direct_replay() {
    let mut history = played(SnapshotPolicy::default(), 6);
    let direct = MatchState::replay(history.moves().iter().map(|m| m.placement()))
        .expect("Valid replay");

    history.goto_move(0).expect("In range");
    assert_eq!(history.current_state(), &MatchState::new());

    let end = history.goto_move(history.len()).expect("In range");
    assert_eq!(end, direct);
}

#[test]
fn test_goto_past_end_fails() {
    let mut history = played(SnapshotPolicy::default(), 3);
    let err = history.goto_move(4).expect_err("Out of range");

    assert_eq!(
        err,
        HistoryError::CursorOutOfRange {
            requested: 4,
            length: 3
        }
    );
    assert_eq!(err.kind(), "CursorOutOfRangeError");
    assert_eq!(history.cursor(), 3);
}

#[test]
fn test_divergence_discards_tail() {
    let mut history = played(SnapshotPolicy::default(), 8);
    let kept: Vec<_> = history.moves()[..3].to_vec();

    history.goto_move(3).expect("In range");
    let m = play_last(&mut history);

    assert_eq!(history.len(), 4);
    assert_eq!(history.cursor(), 4);
    assert_eq!(&history.moves()[..3], kept.as_slice());
    assert_eq!(history.moves()[3].placement(), m);
    assert_eq!(history.moves()[3].sequence(), 3);

    // Same as applying the first three moves and then m directly.
    let direct = MatchState::replay(kept.iter().map(|mv| mv.placement()).chain([m]))
        .expect("Valid replay");
    assert_eq!(history.current_state(), &direct);
}

#[test]
fn test_turn_after_rewind_uses_cursor() {
    let mut history = played(SnapshotPolicy::default(), 5);
    history.goto_move(2).expect("In range");

    assert_eq!(history.next_mark(), Mark::Human);
    let wrong = Placement::new(Slot::TOP_LEFT, Slot::TOP_LEFT, Mark::Opponent);
    let err = history.apply_move(wrong).expect_err("Wrong side");
    assert_eq!(err.kind(), "IllegalMoveError");
    assert_eq!(history.len(), 5);
}

#[test]
fn test_constraint_example_through_history() {
    let mut history = HistoryManager::default();
    for (sub, cell, mark) in [(0, 0, Mark::Human), (0, 1, Mark::Opponent)] {
        let placement = Placement::from_indices(sub, cell, mark).expect("Valid indices");
        history.apply_move(placement).expect("Legal move");
    }
    assert_eq!(
        history.current_state().active_constraint(),
        Constraint::Constrained(Slot::new(1).expect("Valid slot"))
    );

    let off_target = Placement::from_indices(2, 0, Mark::Human).expect("Valid indices");
    let err = history.apply_move(off_target).expect_err("Wrong sub-board");
    assert!(matches!(err, HistoryError::IllegalMove(_)));
}

#[test]
fn test_snapshot_of_empty_game_fails() {
    let mut history = HistoryManager::default();
    let err = history.create_snapshot(None).expect_err("No moves yet");
    assert_eq!(err, HistoryError::NoActiveGame);
    assert_eq!(history.snapshots().count(), 0);
}

#[test]
fn test_restore_returns_to_snapshot() {
    for policy in [SnapshotPolicy::ExactCopy, SnapshotPolicy::Strict] {
        let mut history = played(policy, 5);
        let at_five = history.current_state().clone();
        let id = *history
            .create_snapshot(Some("before attack".to_string()))
            .expect("Snapshot")
            .id();

        for _ in 0..3 {
            play_first(&mut history);
        }
        assert_eq!(history.len(), 8);

        let restored = history.restore_snapshot(id).expect("Restore");
        assert_eq!(restored, at_five);
        assert_eq!(history.len(), 5);
        assert_eq!(history.cursor(), 5);
        assert_eq!(history.goto_move(5).expect("In range"), at_five);
    }
}

#[test]
fn test_exact_copy_survives_divergence() {
    let mut history = played(SnapshotPolicy::ExactCopy, 6);
    let at_six = history.current_state().clone();
    let id = *history.create_snapshot(None).expect("Snapshot").id();

    // Rewrite move 3 and beyond.
    history.goto_move(2).expect("In range");
    play_last(&mut history);
    play_last(&mut history);

    let restored = history.restore_snapshot(id).expect("Never stale");
    assert_eq!(restored, at_six);
    assert_eq!(history.len(), 6);
}

#[test]
fn test_strict_restore_detects_rewritten_prefix() {
    let mut history = played(SnapshotPolicy::Strict, 6);
    let id = *history.create_snapshot(None).expect("Snapshot").id();

    history.goto_move(2).expect("In range");
    play_last(&mut history);
    play_first(&mut history);
    play_first(&mut history);
    play_first(&mut history);
    let before = history.moves().to_vec();

    let err = history.restore_snapshot(id).expect_err("Prefix rewritten");
    assert_eq!(err, HistoryError::SnapshotStale { id, position: 6 });
    assert_eq!(history.moves(), before.as_slice());
}

#[test]
fn test_strict_restore_redoes_unchanged_moves() {
    let mut history = played(SnapshotPolicy::Strict, 6);
    let id = *history.create_snapshot(None).expect("Snapshot").id();

    history.goto_move(4).expect("In range");
    history.restore_snapshot(id).expect("Same timeline");
    assert_eq!(history.len(), 6);
    assert_eq!(history.cursor(), 6);
}

#[test]
fn test_strict_restore_of_shorter_history_keeps_remaining_moves() {
    let mut history = played(SnapshotPolicy::Strict, 6);
    let late = *history.create_snapshot(None).expect("Snapshot").id();
    history.goto_move(3).expect("In range");
    let early = *history.create_snapshot(None).expect("Snapshot").id();
    let prefix = history.moves()[..3].to_vec();

    history.restore_snapshot(early).expect("Restore");
    assert_eq!(history.len(), 3);

    // Only three moves remain, so only those are compared and kept.
    history.restore_snapshot(late).expect("Prefix still matches");
    assert_eq!(history.len(), 3);
    assert_eq!(history.cursor(), 3);
    assert_eq!(history.moves(), prefix.as_slice());
}

#[test]
fn test_restore_unknown_snapshot() {
    let mut history = played(SnapshotPolicy::default(), 2);
    let missing = SnapshotId::generate();
    assert_eq!(
        history.restore_snapshot(missing),
        Err(HistoryError::SnapshotNotFound(missing))
    );
}

#[test]
fn test_snapshots_listed_in_creation_order() {
    let mut history = played(SnapshotPolicy::default(), 2);
    history
        .create_snapshot(Some("opening".to_string()))
        .expect("Snapshot");
    play_first(&mut history);
    history.create_snapshot(None).expect("Snapshot");

    let labels: Vec<_> = history.snapshots().map(|s| s.label().clone()).collect();
    assert_eq!(labels, ["opening", "Snapshot at move 3"]);

    // The iterator can be restarted.
    assert_eq!(history.snapshots().count(), 2);
}

#[test]
fn test_moves_after_game_over_rejected() {
    let mut history = HistoryManager::default();
    while let Some(placement) = history.current_state().legal_moves().first().copied() {
        history.apply_move(placement).expect("Legal move");
    }
    let outcome = history.current_state().winner().expect("Decided");
    let mark = history.next_mark();

    let err = history
        .apply_move(Placement::new(Slot::TOP_LEFT, Slot::TOP_LEFT, mark))
        .expect_err("Game over");
    assert_eq!(err, HistoryError::GameOver(outcome));
    assert!(history.verify().is_ok());
}

#[test]
fn test_history_round_trips_through_stored_parts() {
    let mut history = played(SnapshotPolicy::Strict, 5);
    history.create_snapshot(None).expect("Snapshot");
    history.goto_move(3).expect("In range");

    let rebuilt = HistoryManager::from_stored(
        history.moves().to_vec(),
        history.cursor(),
        history.snapshots().cloned().collect(),
        SnapshotPolicy::Strict,
    )
    .expect("Consistent");

    assert_eq!(rebuilt.current_state(), history.current_state());
    assert_eq!(rebuilt.cursor(), 3);
    assert_eq!(rebuilt.snapshots().count(), 1);
}
