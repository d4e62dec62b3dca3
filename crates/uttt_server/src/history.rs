//! Append/truncate move history with a navigable cursor.
//!
//! The history owns an ordered list of recorded moves and a cursor in
//! `0..=len`. The position at the cursor is always the replay of the first
//! `cursor` moves from an empty board; it is cached and rebuilt on every
//! write. Playing a move while the cursor is behind the head discards the
//! tail first, so the timeline never branches.

use crate::error::HistoryError;
use crate::ids::SnapshotId;
use crate::snapshot::{Snapshot, SnapshotPolicy};
use tracing::{debug, info, instrument, warn};
use uttt_rules::{Mark, MatchState, Move, Placement};

/// Move list, cursor and snapshots for one match.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    moves: Vec<Move>,
    cursor: usize,
    snapshots: Vec<Snapshot>,
    state: MatchState,
    policy: SnapshotPolicy,
    generation: u64,
}

impl HistoryManager {
    /// Creates an empty history.
    pub fn new(policy: SnapshotPolicy) -> Self {
        Self {
            moves: Vec::new(),
            cursor: 0,
            snapshots: Vec::new(),
            state: MatchState::new(),
            policy,
            generation: 0,
        }
    }

    /// Rebuilds a history from persisted parts.
    ///
    /// # Errors
    ///
    /// - [`HistoryError::InvariantViolation`] if sequence numbers are not
    ///   `0, 1, 2, ...` or the moves do not replay legally
    /// - [`HistoryError::CursorOutOfRange`] if the cursor exceeds the moves
    #[instrument(skip(moves, snapshots), fields(moves = moves.len(), snapshots = snapshots.len()))]
    pub fn from_stored(
        moves: Vec<Move>,
        cursor: usize,
        snapshots: Vec<Snapshot>,
        policy: SnapshotPolicy,
    ) -> Result<Self, HistoryError> {
        if let Some((index, mv)) = moves
            .iter()
            .enumerate()
            .find(|(index, mv)| mv.sequence() != *index)
        {
            return Err(HistoryError::InvariantViolation(format!(
                "stored move at position {} has sequence {}",
                index,
                mv.sequence()
            )));
        }

        // The full list must be a legal game, not just the prefix in effect.
        replay(&moves).map_err(|e| {
            HistoryError::InvariantViolation(format!("stored moves do not replay: {}", e))
        })?;

        if cursor > moves.len() {
            return Err(HistoryError::CursorOutOfRange {
                requested: cursor,
                length: moves.len(),
            });
        }

        let state = replay(&moves[..cursor])?;
        debug!(cursor, "History rebuilt from storage");

        Ok(Self {
            moves,
            cursor,
            snapshots,
            state,
            policy,
            generation: 0,
        })
    }

    /// Validates and records a placement at the cursor.
    ///
    /// Moves after the cursor are discarded first. On success the cursor
    /// points just past the new move.
    ///
    /// # Errors
    ///
    /// - [`HistoryError::GameOver`] if the position at the cursor is decided
    /// - [`HistoryError::IllegalMove`] for any other rule violation
    #[instrument(skip(self), fields(cursor = self.cursor, len = self.moves.len()))]
    pub fn apply_move(&mut self, placement: Placement) -> Result<&Move, HistoryError> {
        let next = self.state.apply(placement).map_err(|e| {
            debug!(error = %e, "Placement rejected");
            HistoryError::from(e)
        })?;

        if self.cursor < self.moves.len() {
            let discarded = self.moves.len() - self.cursor;
            self.moves.truncate(self.cursor);
            info!(discarded, at = self.cursor, "Timeline diverged; later moves discarded");
        }

        self.moves.push(Move::record(placement, self.cursor));
        self.cursor += 1;
        self.state = next;
        self.generation += 1;

        info!(%placement, sequence = self.cursor - 1, "Move recorded");
        Ok(&self.moves[self.cursor - 1])
    }

    /// Moves the cursor to `n` without changing the move list.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::CursorOutOfRange`] if `n > len`.
    #[instrument(skip(self), fields(len = self.moves.len()))]
    pub fn goto_move(&mut self, n: usize) -> Result<MatchState, HistoryError> {
        let state = self.state_at(n)?;
        self.cursor = n;
        self.state = state;
        self.generation += 1;
        debug!(cursor = n, "Cursor moved");
        Ok(self.state.clone())
    }

    /// Replays the first `n` moves without moving the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::CursorOutOfRange`] if `n > len`.
    pub fn state_at(&self, n: usize) -> Result<MatchState, HistoryError> {
        if n > self.moves.len() {
            return Err(HistoryError::CursorOutOfRange {
                requested: n,
                length: self.moves.len(),
            });
        }
        replay(&self.moves[..n])
    }

    /// Position produced by the moves before the cursor.
    pub fn current_state(&self) -> &MatchState {
        &self.state
    }

    /// Records a snapshot of the moves in effect.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NoActiveGame`] if no move was ever played.
    #[instrument(skip(self), fields(cursor = self.cursor))]
    pub fn create_snapshot(&mut self, label: Option<String>) -> Result<&Snapshot, HistoryError> {
        if self.moves.is_empty() {
            return Err(HistoryError::NoActiveGame);
        }

        let snapshot = Snapshot::capture(label, self.moves_in_effect());
        info!(id = %snapshot.id(), label = %snapshot.label(), "Snapshot created");
        self.snapshots.push(snapshot);
        let index = self.snapshots.len() - 1;
        Ok(&self.snapshots[index])
    }

    /// Snapshots in creation order.
    pub fn snapshots(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    /// Looks up a snapshot by id.
    pub fn snapshot(&self, id: SnapshotId) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| *s.id() == id)
    }

    /// Returns the timeline to a snapshot.
    ///
    /// Afterwards the move list ends at the cursor. With
    /// [`SnapshotPolicy::ExactCopy`] the snapshot's own moves are reinstated;
    /// with [`SnapshotPolicy::Strict`] the recorded moves are truncated to
    /// `min(cursor_position, len)` if they still match the snapshot.
    ///
    /// # Errors
    ///
    /// - [`HistoryError::SnapshotNotFound`] for an unknown id
    /// - [`HistoryError::SnapshotStale`] under the strict policy when the
    ///   recorded prefix was rewritten
    #[instrument(skip(self), fields(policy = ?self.policy, len = self.moves.len()))]
    pub fn restore_snapshot(&mut self, id: SnapshotId) -> Result<MatchState, HistoryError> {
        let snapshot = self
            .snapshot(id)
            .ok_or(HistoryError::SnapshotNotFound(id))?;

        let (moves, cursor) = match self.policy {
            SnapshotPolicy::ExactCopy => {
                let moves = snapshot.moves().clone();
                let cursor = moves.len();
                (moves, cursor)
            }
            SnapshotPolicy::Strict => {
                let position = (*snapshot.cursor_position()).min(self.moves.len());
                if !snapshot.shares_prefix(&self.moves, position) {
                    warn!(%id, position, "Snapshot prefix no longer matches history");
                    return Err(HistoryError::SnapshotStale { id, position });
                }
                (self.moves[..position].to_vec(), position)
            }
        };

        let state = replay(&moves)?;
        let discarded = self.moves.len().saturating_sub(cursor);
        self.moves = moves;
        self.cursor = cursor;
        self.state = state;
        self.generation += 1;

        info!(%id, cursor, discarded, "Snapshot restored");
        Ok(self.state.clone())
    }

    /// Checks that the cached position equals a fresh replay.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvariantViolation`] on mismatch.
    pub fn verify(&self) -> Result<(), HistoryError> {
        let replayed = replay(&self.moves[..self.cursor])?;
        if replayed != self.state {
            return Err(HistoryError::InvariantViolation(format!(
                "cached position at move {} differs from replay",
                self.cursor
            )));
        }
        Ok(())
    }

    /// Recorded moves, including any after the cursor.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Moves before the cursor.
    pub fn moves_in_effect(&self) -> &[Move] {
        &self.moves[..self.cursor]
    }

    /// Number of recorded moves.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Checks if no move was recorded.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Cursor position in `0..=len`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Checks if the cursor is at the end of the moves.
    pub fn is_at_head(&self) -> bool {
        self.cursor == self.moves.len()
    }

    /// Side to move at the cursor.
    pub fn next_mark(&self) -> Mark {
        Mark::to_move_after(self.cursor)
    }

    /// Counter bumped by every change to the moves or cursor.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Restore policy in effect.
    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }
}

#[cfg(test)]
impl HistoryManager {
    /// Replaces the cached position without touching the moves.
    pub(crate) fn overwrite_cached_state(&mut self, state: MatchState) {
        self.state = state;
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(SnapshotPolicy::default())
    }
}

fn replay(moves: &[Move]) -> Result<MatchState, HistoryError> {
    MatchState::replay(moves.iter().map(Move::placement)).map_err(HistoryError::from)
}
