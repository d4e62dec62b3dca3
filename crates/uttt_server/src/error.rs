//! Errors surfaced by history navigation and match sessions.

use crate::ids::{GameId, SnapshotId};
use crate::opponent::MoveSourceError;
use crate::store::StoreError;
use uttt_rules::{MoveError, Outcome};

/// Error from a [`HistoryManager`](crate::HistoryManager) operation.
///
/// Every failed operation leaves the history unchanged.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum HistoryError {
    /// The placement breaks a rule at the cursor position.
    #[display("Illegal move: {}", _0)]
    IllegalMove(MoveError),

    /// The position at the cursor is already decided.
    #[display("Game is already over: {}", _0)]
    GameOver(Outcome),

    /// Navigation target outside `0..=len`.
    #[display("Cannot go to move {}: history has {} moves", requested, length)]
    CursorOutOfRange {
        /// Requested cursor position.
        requested: usize,
        /// Moves in the history.
        length: usize,
    },

    /// A snapshot was requested before any move was played.
    #[display("No active game: play a move before taking a snapshot")]
    NoActiveGame,

    /// No snapshot with this id.
    #[display("Snapshot {} not found", _0)]
    SnapshotNotFound(SnapshotId),

    /// The recorded moves no longer match the snapshot's prefix.
    #[display("Snapshot {} is stale: moves before {} were rewritten", id, position)]
    SnapshotStale {
        /// Snapshot being restored.
        id: SnapshotId,
        /// Prefix length that was compared.
        position: usize,
    },

    /// Replayed and cached state disagree, or stored moves are inconsistent.
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::IllegalMove(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MoveError> for HistoryError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::GameOver(outcome) => HistoryError::GameOver(outcome),
            MoveError::InvariantViolation(description) => {
                HistoryError::InvariantViolation(description)
            }
            other => HistoryError::IllegalMove(other),
        }
    }
}

impl HistoryError {
    /// Stable tag for the presentation layer.
    pub fn kind(&self) -> &'static str {
        match self {
            HistoryError::IllegalMove(_) => "IllegalMoveError",
            HistoryError::GameOver(_) => "GameOverError",
            HistoryError::CursorOutOfRange { .. } => "CursorOutOfRangeError",
            HistoryError::NoActiveGame => "NoActiveGameError",
            HistoryError::SnapshotNotFound(_) => "SnapshotNotFoundError",
            HistoryError::SnapshotStale { .. } => "SnapshotStaleError",
            HistoryError::InvariantViolation(_) => "InvariantViolation",
        }
    }
}

/// Error from a [`MatchSession`](crate::MatchSession) or
/// [`SessionManager`](crate::SessionManager) operation.
#[derive(Debug, derive_more::Display)]
pub enum SessionError {
    /// History rejected the operation.
    #[display("{}", _0)]
    History(HistoryError),

    /// Another operation on the same match is in flight.
    #[display("Match {} is busy: {}", game_id, reason)]
    Concurrency {
        /// Contended match.
        game_id: GameId,
        /// What is in flight.
        reason: &'static str,
    },

    /// The opponent's move could not be obtained or was unusable.
    #[display("Opponent move failed: {}", _0)]
    MoveSource(MoveSourceError),

    /// Persisting the change failed; in-memory state was left untouched.
    #[display("{}", _0)]
    Store(StoreError),

    /// An earlier invariant violation disabled this match until reload.
    #[display("Match {} is disabled after an invariant violation; reload it", _0)]
    Poisoned(GameId),

    /// No such match, or it was closed.
    #[display("Game {} not found", _0)]
    UnknownGame(GameId),
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::History(e) => Some(e),
            SessionError::MoveSource(e) => Some(e),
            SessionError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl SessionError {
    /// Stable tag for the presentation layer.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::History(e) => e.kind(),
            SessionError::Concurrency { .. } => "ConcurrencyError",
            SessionError::MoveSource(_) => "MoveSourceError",
            SessionError::Store(_) => "StoreError",
            SessionError::Poisoned(_) => "InvariantViolation",
            SessionError::UnknownGame(_) => "UnknownGameError",
        }
    }
}

impl From<HistoryError> for SessionError {
    fn from(err: HistoryError) -> Self {
        SessionError::History(err)
    }
}

impl From<MoveSourceError> for SessionError {
    fn from(err: MoveSourceError) -> Self {
        SessionError::MoveSource(err)
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Store(err)
    }
}
